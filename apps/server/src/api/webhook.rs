//! Aggregator webhook receiver.
//!
//! The signature is checked over the raw body before anything is parsed.
//! Events for items this server does not know are acknowledged and dropped.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};

use super::run_detached;
use crate::error::ApiResult;
use crate::main_lib::AppState;
use ledgerlink_connect::webhook::{authenticate, SIGNATURE_HEADER};
use ledgerlink_connect::WebhookEvent;
use ledgerlink_core::sync::SyncTrigger;
use ledgerlink_core::Error;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    institution_id: Option<String>,
}

impl WebhookResponse {
    fn ignored() -> Self {
        Self {
            status: "ignored",
            job_id: None,
            institution_id: None,
        }
    }
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    authenticate(state.webhook_secret.as_deref(), &body, signature)?;

    let response = match WebhookEvent::parse(&body)? {
        WebhookEvent::TransactionsUpdate { item_id } => {
            let orchestrator = state.orchestrator.clone();
            match run_detached(async move {
                orchestrator.sync_item(&item_id, SyncTrigger::Webhook).await
            })
            .await
            {
                Ok(outcome) => WebhookResponse {
                    status: "synced",
                    job_id: Some(outcome.job_id),
                    institution_id: Some(outcome.institution_id),
                },
                Err(Error::NotFound(msg)) => {
                    warn!("Ignoring transactions webhook: {}", msg);
                    WebhookResponse::ignored()
                }
                Err(err) => return Err(err.into()),
            }
        }
        WebhookEvent::ItemError { item_id, code } => {
            match state.orchestrator.mark_item_error(&item_id, &code).await {
                Ok(institution_id) => WebhookResponse {
                    status: "recorded",
                    job_id: None,
                    institution_id: Some(institution_id),
                },
                Err(Error::NotFound(msg)) => {
                    warn!("Ignoring item error webhook: {}", msg);
                    WebhookResponse::ignored()
                }
                Err(err) => return Err(err.into()),
            }
        }
        WebhookEvent::Ignored {
            webhook_type,
            webhook_code,
        } => {
            info!("Ignoring webhook {}/{}", webhook_type, webhook_code);
            WebhookResponse::ignored()
        }
    };
    Ok(Json(response))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", post(receive_webhook))
}
