use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::link::SyncResponse;
use super::run_detached;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use ledgerlink_core::institutions::InstitutionSummary;
use ledgerlink_core::sync::{SyncJob, UnlinkSummary};

const DEFAULT_JOB_LIMIT: i64 = 20;
const MAX_JOB_LIMIT: i64 = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnlinkResponse {
    success: bool,
    message: String,
    institution_id: String,
    revoked: bool,
    deleted: UnlinkSummary,
}

#[derive(Debug, Deserialize)]
struct JobsQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FireWebhookResponse {
    success: bool,
    message: String,
    webhook_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list_institutions(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<InstitutionSummary>>> {
    Ok(Json(state.institutions.list_summaries()?))
}

async fn refresh_institution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SyncResponse>> {
    let orchestrator = state.orchestrator.clone();
    let outcome = run_detached(async move { orchestrator.refresh(&id).await }).await?;
    Ok(Json(SyncResponse::from_outcome("Refreshed", outcome)))
}

async fn unlink_institution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UnlinkResponse>> {
    let outcome = state.orchestrator.unlink(&id).await?;
    let message = if outcome.revoked {
        format!("Unlinked {}", outcome.institution_id)
    } else {
        format!(
            "Unlinked {}, the aggregator credential could not be revoked",
            outcome.institution_id
        )
    };
    info!("{}", message);
    Ok(Json(UnlinkResponse {
        success: true,
        message,
        institution_id: outcome.institution_id,
        revoked: outcome.revoked,
        deleted: outcome.deleted,
    }))
}

async fn list_sync_jobs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<JobsQuery>,
) -> ApiResult<Json<Vec<SyncJob>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_JOB_LIMIT)
        .clamp(1, MAX_JOB_LIMIT);
    Ok(Json(state.sync_jobs.list_for_institution(&id, limit)?))
}

async fn fire_sandbox_webhook(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<FireWebhookResponse>> {
    if !state.plaid_environment.is_sandbox() {
        return Err(ApiError::BadRequest(
            "Test webhooks are only available in the sandbox environment".to_string(),
        ));
    }
    state.orchestrator.fire_test_webhook(&id).await?;
    Ok(Json(FireWebhookResponse {
        success: true,
        message: format!("Fired test webhook for {}", id),
        webhook_url: state.webhook_url.clone(),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/institutions", get(list_institutions))
        .route("/institutions/{id}", delete(unlink_institution))
        .route("/institutions/{id}/refresh", post(refresh_institution))
        .route("/institutions/{id}/sync-jobs", get(list_sync_jobs))
        .route(
            "/institutions/{id}/sandbox/fire-webhook",
            post(fire_sandbox_webhook),
        )
}
