//! Link endpoint: exchanges a public token and runs the first sync.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::run_detached;
use crate::error::ApiResult;
use crate::main_lib::AppState;
use ledgerlink_connect::SyncOutcome;
use ledgerlink_core::institutions::LinkMetadata;
use ledgerlink_core::sync::{ReconcileSummary, SyncMode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRequest {
    public_token: String,
    #[serde(default)]
    metadata: LinkMetadata,
}

/// Body returned by link, refresh and webhook syncs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub job_id: String,
    pub institution_id: String,
    pub institution_name: String,
    pub mode: SyncMode,
    pub summary: ReconcileSummary,
}

impl SyncResponse {
    pub fn from_outcome(verb: &str, outcome: SyncOutcome) -> Self {
        let s = &outcome.summary;
        let message = format!(
            "{} {}: {} accounts, {} added, {} modified, {} removed transactions",
            verb,
            outcome.institution_name,
            s.accounts.total(),
            s.transactions_added,
            s.transactions_modified,
            s.transactions_removed
        );
        Self {
            success: true,
            message,
            job_id: outcome.job_id,
            institution_id: outcome.institution_id,
            institution_name: outcome.institution_name,
            mode: outcome.mode,
            summary: outcome.summary,
        }
    }
}

async fn link(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LinkRequest>,
) -> ApiResult<Json<SyncResponse>> {
    let orchestrator = state.orchestrator.clone();
    let outcome = run_detached(async move {
        orchestrator
            .link(&body.public_token, &body.metadata)
            .await
    })
    .await?;
    info!(
        "Linked institution {} in job {}",
        outcome.institution_id, outcome.job_id
    );
    Ok(Json(SyncResponse::from_outcome("Linked", outcome)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/link", post(link))
}
