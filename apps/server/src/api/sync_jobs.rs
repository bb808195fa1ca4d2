use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use ledgerlink_core::sync::SyncJob;
use ledgerlink_core::Error;

async fn get_sync_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SyncJob>> {
    state
        .sync_jobs
        .get(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::from(Error::NotFound(format!("Sync job {} not found", id))))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sync-jobs/{id}", get(get_sync_job))
}
