use std::future::Future;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, StatusCode},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::main_lib::AppState;
use ledgerlink_core::errors::{Error, Result};

mod health;
mod institutions;
mod link;
mod mappings;
mod sync_jobs;
mod webhook;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(link::router())
        .merge(institutions::router())
        .merge(sync_jobs::router())
        .merge(webhook::router())
        .merge(mappings::router());

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(cors_layer(&config.cors_allow_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

/// Runs a sync on its own task and waits for it.
///
/// A request dropped by the timeout layer or a client disconnect no longer
/// cancels the sync halfway; it still finishes its job record and cleanup.
pub(crate) async fn run_detached<F, T>(task: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| Error::Unexpected(format!("Sync task did not finish: {}", e)))?
}
