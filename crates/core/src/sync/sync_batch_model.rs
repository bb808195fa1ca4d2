//! The staged unit of work for one institution sync.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sync_cursor_model::SyncMode;
use crate::accounts::{AccountSnapshot, AccountUpsertCounts, Liabilities};
use crate::institutions::{ExchangedToken, InstitutionSnapshot};
use crate::transactions::TransactionChanges;
use crate::Result;

/// Everything one sync attempt wants to write.
///
/// A batch is committed as a whole or not at all: institution, credential,
/// accounts with their balance extensions, transaction upserts, removals and
/// the new cursor share one database transaction.
#[derive(Debug, Clone)]
pub struct SyncBatch {
    /// Sync job that produced this batch; stamped on every written row.
    pub job_id: String,
    pub pulled_at: DateTime<Utc>,
    pub mode: SyncMode,
    pub institution: InstitutionSnapshot,
    /// Present on link, when a fresh credential must be stored.
    pub credential: Option<ExchangedToken>,
    pub accounts: Vec<AccountSnapshot>,
    pub liabilities: Liabilities,
    pub changes: TransactionChanges,
    /// Cursor of the last page. `None` leaves the cursor pending.
    pub next_cursor: Option<String>,
}

impl SyncBatch {
    pub fn institution_id(&self) -> &str {
        &self.institution.id
    }
}

/// Counts written by one committed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub institution_id: String,
    pub accounts: AccountUpsertCounts,
    pub transactions_added: u32,
    pub transactions_modified: u32,
    pub transactions_removed: u32,
    pub cursor: Option<String>,
}

impl ReconcileSummary {
    pub fn transactions_upserted(&self) -> u32 {
        self.transactions_added + self.transactions_modified
    }
}

/// Rows deleted by an unlink, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkSummary {
    pub transactions: usize,
    pub balance_extensions: usize,
    pub accounts: usize,
    pub cursors: usize,
    pub credentials: usize,
    pub institutions: usize,
}

/// Transactional store used by the link orchestrator.
#[async_trait]
pub trait SyncStoreTrait: Send + Sync {
    /// Reconciles and persists a batch atomically. On error nothing from the
    /// batch is written and the previous cursor stays in place.
    async fn commit_batch(&self, batch: SyncBatch) -> Result<ReconcileSummary>;

    /// Number of stored transactions across the institution's accounts.
    fn count_transactions(&self, institution_id: &str) -> Result<i64>;

    /// Deletes every row of one institution in dependency order, atomically:
    /// transactions and balance extensions, accounts, cursor, credential,
    /// institution.
    async fn purge_institution(&self, institution_id: &str) -> Result<UnlinkSummary>;
}
