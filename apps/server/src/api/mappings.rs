use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::main_lib::AppState;
use ledgerlink_core::classification::{Mapping, MappingApply, MappingKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetMappingRequest {
    transaction_name: String,
    value: String,
    #[serde(default)]
    apply: MappingApply,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetMappingResponse {
    success: bool,
    kind: MappingKind,
    transaction_name: String,
    value: String,
    /// Existing transactions rewritten with the new value.
    updated: usize,
}

fn list(state: &AppState, kind: MappingKind) -> ApiResult<Json<Vec<Mapping>>> {
    Ok(Json(state.mappings.list(kind)?))
}

async fn set(
    state: &AppState,
    kind: MappingKind,
    body: SetMappingRequest,
) -> ApiResult<Json<SetMappingResponse>> {
    let updated = state
        .mappings
        .set_and_apply(kind, &body.transaction_name, &body.value, body.apply)
        .await?;
    Ok(Json(SetMappingResponse {
        success: true,
        kind,
        transaction_name: body.transaction_name.trim().to_string(),
        value: body.value.trim().to_string(),
        updated,
    }))
}

async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Mapping>>> {
    list(&state, MappingKind::Category)
}

async fn set_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetMappingRequest>,
) -> ApiResult<Json<SetMappingResponse>> {
    set(&state, MappingKind::Category, body).await
}

async fn list_groups(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Mapping>>> {
    list(&state, MappingKind::Group)
}

async fn set_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetMappingRequest>,
) -> ApiResult<Json<SetMappingResponse>> {
    set(&state, MappingKind::Group, body).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/mappings/categories",
            get(list_categories).put(set_category),
        )
        .route("/mappings/groups", get(list_groups).put(set_group))
}
