//! Link orchestrator - coordinates aggregator fetches with atomic commits.

use chrono::Utc;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use ledgerlink_core::accounts::Liabilities;
use ledgerlink_core::errors::{Error, Result, ValidationError};
use ledgerlink_core::institutions::{
    ExchangedToken, InstitutionHealth, InstitutionRepositoryTrait, InstitutionSnapshot,
    LinkMetadata,
};
use ledgerlink_core::sync::{
    CursorRepositoryTrait, LinkStage, SyncBatch, SyncJob, SyncJobRepositoryTrait, SyncMode,
    SyncStoreTrait, SyncTrigger,
};
use ledgerlink_core::transactions::TransactionChanges;

use super::models::{SyncOutcome, UnlinkOutcome};
use crate::aggregator::{
    fetch_full_history, sync_all_pages, AggregatorApiClient, RetryConfig, SyncConfig,
};
use crate::webhook::SYNC_UPDATES_AVAILABLE;

/// Product name that enables the liabilities fetch.
const LIABILITIES_PRODUCT: &str = "liabilities";

/// How the transactions of one sync are fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncPlan {
    Full,
    Incremental(String),
}

/// Coordinates linking and syncing of institutions.
///
/// Every attempt stages its writes in a [`SyncBatch`] and commits them in
/// one transaction, so a failure at any stage leaves prior data and the
/// saved cursor untouched. Attempts for the same institution are
/// serialized; different institutions run independently.
pub struct LinkOrchestrator {
    client: Arc<dyn AggregatorApiClient>,
    institutions: Arc<dyn InstitutionRepositoryTrait>,
    cursors: Arc<dyn CursorRepositoryTrait>,
    store: Arc<dyn SyncStoreTrait>,
    jobs: Arc<dyn SyncJobRepositoryTrait>,
    config: SyncConfig,
    retry: RetryConfig,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LinkOrchestrator {
    pub fn new(
        client: Arc<dyn AggregatorApiClient>,
        institutions: Arc<dyn InstitutionRepositoryTrait>,
        cursors: Arc<dyn CursorRepositoryTrait>,
        store: Arc<dyn SyncStoreTrait>,
        jobs: Arc<dyn SyncJobRepositoryTrait>,
    ) -> Self {
        Self {
            client,
            institutions,
            cursors,
            store,
            jobs,
            config: SyncConfig::default(),
            retry: RetryConfig::default(),
            locks: DashMap::new(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig, retry: RetryConfig) -> Self {
        self.config = config;
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Link
    // ─────────────────────────────────────────────────────────────────────────

    /// Links a new institution from a public token and syncs it.
    ///
    /// If anything fails after the token exchange, nothing is written locally
    /// and a freshly created item is revoked on the aggregator.
    pub async fn link(&self, public_token: &str, metadata: &LinkMetadata) -> Result<SyncOutcome> {
        if public_token.trim().is_empty() {
            return Err(ValidationError::MissingField("publicToken".to_string()).into());
        }

        let mut job = self.open_job(SyncJob::new(SyncTrigger::Link)).await?;
        info!(
            "[{}] Linking institution {}",
            job.id,
            metadata
                .institution_name
                .as_deref()
                .or(metadata.institution_id.as_deref())
                .unwrap_or("<unknown>")
        );

        let token = match self.client.exchange_public_token(public_token.trim()).await {
            Ok(token) => token,
            Err(err) => {
                error!("[{}] Token exchange failed: {}", job.id, err);
                self.fail_job(&mut job, &err).await;
                return Err(err);
            }
        };
        job.item_id = Some(token.item_id.clone());
        self.advance(&mut job, LinkStage::TokenExchanged).await;

        // An item we already store belongs to a prior successful link.
        let item_known = matches!(self.institutions.get_by_item_id(&token.item_id), Ok(Some(_)));

        match self.link_exchanged(&mut job, &token, metadata).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(
                    "[{}] Link failed at stage {}: {}",
                    job.id, job.stage, err
                );
                self.fail_job(&mut job, &err).await;
                if item_known {
                    info!(
                        "[{}] Keeping item {} which is already linked",
                        job.id, token.item_id
                    );
                } else {
                    self.revoke(&job.id, &token).await;
                }
                Err(err)
            }
        }
    }

    async fn link_exchanged(
        &self,
        job: &mut SyncJob,
        token: &ExchangedToken,
        metadata: &LinkMetadata,
    ) -> Result<SyncOutcome> {
        let snapshot = self
            .client
            .get_institution_metadata(&token.access_token)
            .await?;
        if let Some(expected) = metadata.institution_id.as_deref() {
            if expected != snapshot.id {
                warn!(
                    "[{}] Link metadata names institution {} but item belongs to {}",
                    job.id, expected, snapshot.id
                );
            }
        }
        job.institution_id = Some(snapshot.id.clone());
        self.advance(job, LinkStage::InstitutionSaved).await;

        let lock = self.lock_for(&snapshot.id);
        let _guard = lock.lock().await;

        let mut superseded = None;
        let plan = match self.institutions.get_credential(&snapshot.id)? {
            Some(existing) if existing.item_id == token.item_id => {
                debug!(
                    "[{}] Institution {} already linked under item {}",
                    job.id, snapshot.id, token.item_id
                );
                self.plan(&snapshot.id).await?
            }
            Some(existing) => {
                // The saved cursor belongs to the old item; the commit replaces it
                // and drops the accounts the new item no longer reports.
                info!(
                    "[{}] Institution {} relinked under item {} (was {}), running full sync",
                    job.id, snapshot.id, token.item_id, existing.item_id
                );
                superseded = Some(existing);
                SyncPlan::Full
            }
            None => SyncPlan::Full,
        };

        let outcome = self
            .run_sync(
                job,
                &token.access_token,
                Some(token.clone()),
                snapshot,
                plan,
            )
            .await?;

        if let Some(old) = superseded {
            match self.client.remove_item(&old.access_token).await {
                Ok(()) => info!(
                    "[{}] Revoked superseded item {} of {}",
                    job.id, old.item_id, old.institution_id
                ),
                Err(e) => warn!(
                    "[{}] Failed to revoke superseded item {} of {}: {}",
                    job.id, old.item_id, old.institution_id, e
                ),
            }
        }
        Ok(outcome)
    }

    async fn revoke(&self, job_id: &str, token: &ExchangedToken) {
        match self.client.remove_item(&token.access_token).await {
            Ok(()) => info!("[{}] Revoked item {} after failed link", job_id, token.item_id),
            Err(e) => warn!(
                "[{}] Failed to revoke item {} after failed link: {}",
                job_id, token.item_id, e
            ),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refresh / webhook sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Syncs an already linked institution with its saved credential.
    pub async fn refresh(&self, institution_id: &str) -> Result<SyncOutcome> {
        self.resync(institution_id, SyncTrigger::Refresh).await
    }

    /// Webhook entry point: resolves the item and syncs its institution.
    pub async fn sync_item(&self, item_id: &str, trigger: SyncTrigger) -> Result<SyncOutcome> {
        let institution = self
            .institutions
            .get_by_item_id(item_id)?
            .ok_or_else(|| Error::NotFound(format!("No institution linked for item {}", item_id)))?;
        self.resync(&institution.id, trigger).await
    }

    /// Marks the institution behind an item unhealthy. Returns its id.
    pub async fn mark_item_error(&self, item_id: &str, code: &str) -> Result<String> {
        let institution = self
            .institutions
            .get_by_item_id(item_id)?
            .ok_or_else(|| Error::NotFound(format!("No institution linked for item {}", item_id)))?;
        warn!(
            "Item {} of institution {} reported error {}",
            item_id, institution.id, code
        );
        self.institutions
            .set_health(&institution.id, InstitutionHealth::Unhealthy)
            .await?;
        Ok(institution.id)
    }

    async fn resync(&self, institution_id: &str, trigger: SyncTrigger) -> Result<SyncOutcome> {
        let mut job = self
            .open_job(SyncJob::new(trigger).for_institution(institution_id))
            .await?;
        info!(
            "[{}] {} sync for institution {}",
            job.id,
            trigger.as_str(),
            institution_id
        );

        let lock = self.lock_for(institution_id);
        let _guard = lock.lock().await;

        match self.resync_locked(&mut job, institution_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(
                    "[{}] Sync of {} failed at stage {}: {}",
                    job.id, institution_id, job.stage, err
                );
                self.fail_job(&mut job, &err).await;
                if err.as_aggregator().is_some_and(|e| e.is_permanent()) {
                    if let Err(e) = self
                        .institutions
                        .set_health(institution_id, InstitutionHealth::Unhealthy)
                        .await
                    {
                        warn!(
                            "[{}] Failed to mark institution {} unhealthy: {}",
                            job.id, institution_id, e
                        );
                    }
                }
                Err(err)
            }
        }
    }

    async fn resync_locked(&self, job: &mut SyncJob, institution_id: &str) -> Result<SyncOutcome> {
        let credential = self
            .institutions
            .get_credential(institution_id)?
            .ok_or_else(|| {
                Error::NotFound(format!("No credential for institution {}", institution_id))
            })?;
        job.item_id = Some(credential.item_id.clone());

        let plan = self.plan(institution_id).await?;

        let snapshot = self
            .client
            .get_institution_metadata(&credential.access_token)
            .await?;
        if snapshot.id != institution_id {
            return Err(Error::Unexpected(format!(
                "Item {} now reports institution {} instead of {}",
                credential.item_id, snapshot.id, institution_id
            )));
        }
        self.advance(job, LinkStage::InstitutionSaved).await;

        self.run_sync(job, &credential.access_token, None, snapshot, plan)
            .await
    }

    /// Chooses full or incremental sync for a stored institution.
    ///
    /// A saved cursor with no stored transactions is reset first.
    async fn plan(&self, institution_id: &str) -> Result<SyncPlan> {
        let cursor = self.cursors.get(institution_id)?;
        let Some(resumable) = cursor
            .as_ref()
            .and_then(|c| c.resumable())
            .map(str::to_string)
        else {
            return Ok(SyncPlan::Full);
        };

        if self.store.count_transactions(institution_id)? == 0 {
            warn!(
                "Institution {} has a cursor but no transactions, resetting cursor",
                institution_id
            );
            self.cursors.reset(institution_id).await?;
            return Ok(SyncPlan::Full);
        }
        Ok(SyncPlan::Incremental(resumable))
    }

    /// Fetches accounts and transactions and commits them as one batch.
    async fn run_sync(
        &self,
        job: &mut SyncJob,
        access_token: &str,
        credential: Option<ExchangedToken>,
        snapshot: InstitutionSnapshot,
        plan: SyncPlan,
    ) -> Result<SyncOutcome> {
        let accounts = self.client.list_accounts(access_token).await?;
        let liabilities = if snapshot.supports(LIABILITIES_PRODUCT) {
            match self.client.list_liabilities(access_token).await {
                Ok(liabilities) => liabilities,
                Err(e) => {
                    warn!(
                        "[{}] Liabilities of {} unavailable, continuing without them: {}",
                        job.id, snapshot.id, e
                    );
                    Liabilities::default()
                }
            }
        } else {
            Liabilities::default()
        };
        debug!(
            "[{}] Fetched {} accounts, {} credit and {} loan liabilities",
            job.id,
            accounts.len(),
            liabilities.credit.len(),
            liabilities.loans.len()
        );
        self.advance(job, LinkStage::AccountsFetched).await;

        let (mode, changes, next_cursor) = self.fetch_transactions(access_token, plan).await?;
        job.mode = Some(mode);
        self.advance(job, LinkStage::TransactionsFetched).await;

        let institution_name = snapshot.name.clone();
        let batch = SyncBatch {
            job_id: job.id.clone(),
            pulled_at: Utc::now(),
            mode,
            institution: snapshot,
            credential,
            accounts,
            liabilities,
            changes,
            next_cursor,
        };
        let summary = self.store.commit_batch(batch).await?;

        job.complete(&summary);
        self.save_job(job).await;
        info!(
            "[{}] {} sync of {} committed: {} accounts, +{} ~{} -{} transactions",
            job.id,
            mode.as_str(),
            summary.institution_id,
            summary.accounts.total(),
            summary.transactions_added,
            summary.transactions_modified,
            summary.transactions_removed
        );

        Ok(SyncOutcome {
            job_id: job.id.clone(),
            institution_id: summary.institution_id.clone(),
            institution_name,
            mode,
            summary,
        })
    }

    async fn fetch_transactions(
        &self,
        access_token: &str,
        plan: SyncPlan,
    ) -> Result<(SyncMode, TransactionChanges, Option<String>)> {
        match plan {
            SyncPlan::Full => {
                let history =
                    fetch_full_history(self.client.as_ref(), access_token, &self.config, &self.retry)
                        .await?;
                debug!("Full history obtained via {:?}", history.source);
                Ok((SyncMode::Full, history.changes, history.next_cursor))
            }
            SyncPlan::Incremental(cursor) => {
                let synced =
                    sync_all_pages(self.client.as_ref(), access_token, Some(&cursor), &self.config)
                        .await?;
                Ok((
                    SyncMode::Incremental,
                    synced.changes,
                    Some(synced.next_cursor),
                ))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unlink
    // ─────────────────────────────────────────────────────────────────────────

    /// Revokes the credential (best effort) and deletes every row of the
    /// institution in dependency order.
    pub async fn unlink(&self, institution_id: &str) -> Result<UnlinkOutcome> {
        let lock = self.lock_for(institution_id);
        let guard = lock.lock().await;

        if self.institutions.get(institution_id)?.is_none() {
            return Err(Error::NotFound(format!(
                "Institution {} is not linked",
                institution_id
            )));
        }

        let revoked = match self.institutions.get_credential(institution_id)? {
            Some(credential) => match self.client.remove_item(&credential.access_token).await {
                Ok(()) => {
                    info!("Revoked item {} of {}", credential.item_id, institution_id);
                    true
                }
                Err(e) => {
                    warn!(
                        "Failed to revoke item {} of {}, deleting local data anyway: {}",
                        credential.item_id, institution_id, e
                    );
                    false
                }
            },
            None => false,
        };

        let deleted = self.store.purge_institution(institution_id).await?;
        drop(guard);
        drop(lock);
        release_lock(&self.locks, institution_id);

        Ok(UnlinkOutcome {
            institution_id: institution_id.to_string(),
            revoked,
            deleted,
        })
    }

    /// Asks the sandbox to send a transactions webhook for the institution.
    pub async fn fire_test_webhook(&self, institution_id: &str) -> Result<()> {
        let credential = self
            .institutions
            .get_credential(institution_id)?
            .ok_or_else(|| {
                Error::NotFound(format!("No credential for institution {}", institution_id))
            })?;
        self.client
            .fire_test_webhook(&credential.access_token, SYNC_UPDATES_AVAILABLE)
            .await?;
        info!("Fired sandbox webhook for item {}", credential.item_id);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn lock_for(&self, institution_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(institution_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    async fn open_job(&self, mut job: SyncJob) -> Result<SyncJob> {
        job.start();
        self.jobs.create(job).await
    }

    async fn advance(&self, job: &mut SyncJob, stage: LinkStage) {
        job.advance(stage);
        debug!("[{}] Reached stage {}", job.id, stage);
        self.save_job(job).await;
    }

    async fn fail_job(&self, job: &mut SyncJob, err: &Error) {
        job.fail(err.to_string());
        self.save_job(job).await;
    }

    async fn save_job(&self, job: &SyncJob) {
        if let Err(e) = self.jobs.update(job.clone()).await {
            warn!("[{}] Failed to record sync job: {}", job.id, e);
        }
    }
}

/// Drops the lock entry of an institution unless another task still holds
/// or awaits it.
fn release_lock(locks: &DashMap<String, Arc<Mutex<()>>>, institution_id: &str) {
    locks.remove_if(institution_id, |_, lock| Arc::strong_count(lock) == 1);
}
