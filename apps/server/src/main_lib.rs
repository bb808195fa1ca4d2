use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use ledgerlink_connect::{
    AggregatorApiClient, LinkOrchestrator, PlaidApiClient, PlaidEnvironment,
    TrackedAggregatorClient,
};
use ledgerlink_core::{
    classification::{MappingRepositoryTrait, OverrideRules},
    institutions::InstitutionRepositoryTrait,
    sync::SyncJobRepositoryTrait,
};
use ledgerlink_storage_sqlite::{
    db, ApiCallLogRepository, CursorRepository, InstitutionRepository, MappingRepository,
    SqliteSyncStore, SyncJobRepository,
};

pub struct AppState {
    pub orchestrator: Arc<LinkOrchestrator>,
    pub institutions: Arc<dyn InstitutionRepositoryTrait>,
    pub mappings: Arc<dyn MappingRepositoryTrait>,
    pub sync_jobs: Arc<dyn SyncJobRepositoryTrait>,
    pub webhook_secret: Option<String>,
    pub webhook_url: Option<String>,
    pub plaid_environment: PlaidEnvironment,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("LL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Builds the application state with the Plaid client from `config`.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let client = PlaidApiClient::new(config.plaid.clone())
        .context("PLAID_CLIENT_ID and PLAID_SECRET must be set")?;
    tracing::info!("Aggregator environment: {}", config.plaid.environment);
    build_state_with_client(config, client).await
}

/// Builds the application state around any aggregator client.
pub async fn build_state_with_client<C>(config: &Config, client: C) -> anyhow::Result<Arc<AppState>>
where
    C: AggregatorApiClient + 'static,
{
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let rules = load_rules(config)?;

    let institution_repository = Arc::new(InstitutionRepository::new(pool.clone(), writer.clone()));
    let cursor_repository = Arc::new(CursorRepository::new(pool.clone(), writer.clone()));
    let mapping_repository = Arc::new(MappingRepository::new(pool.clone(), writer.clone()));
    let sync_job_repository = Arc::new(SyncJobRepository::new(pool.clone(), writer.clone()));
    let api_call_repository = Arc::new(ApiCallLogRepository::new(pool.clone(), writer.clone()));
    let sync_store = Arc::new(SqliteSyncStore::new(pool.clone(), writer.clone(), rules));

    // Nothing can still be running from a previous process.
    let interrupted = sync_job_repository
        .fail_unfinished("Interrupted before completion")
        .await?;
    if interrupted > 0 {
        tracing::warn!("Marked {} interrupted sync job(s) failed", interrupted);
    }

    let tracked_client = Arc::new(TrackedAggregatorClient::new(client, api_call_repository));
    let orchestrator = LinkOrchestrator::new(
        tracked_client,
        institution_repository.clone(),
        cursor_repository,
        sync_store,
        sync_job_repository.clone(),
    )
    .with_config(config.sync.clone(), config.retry.clone());

    if config.webhook_secret.is_none() {
        tracing::warn!("PLAID_WEBHOOK_SECRET is not set, incoming webhooks will be rejected");
    }

    Ok(Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        institutions: institution_repository,
        mappings: mapping_repository,
        sync_jobs: sync_job_repository,
        webhook_secret: config.webhook_secret.clone(),
        webhook_url: config.webhook_url(),
        plaid_environment: config.plaid.environment,
        db_path,
    }))
}

fn load_rules(config: &Config) -> anyhow::Result<OverrideRules> {
    let Some(path) = &config.classification_rules else {
        return Ok(OverrideRules::new());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read classification rules {}", path.display()))?;
    let rules = OverrideRules::from_json(&json)?;
    tracing::info!(
        "Loaded {} classification override rule(s) from {}",
        rules.len(),
        path.display()
    );
    Ok(rules)
}
