//! Tracked sync job models.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::link_stage::LinkStage;
use super::sync_batch_model::ReconcileSummary;
use super::sync_cursor_model::SyncMode;
use crate::errors::{Error, ValidationError};

/// What started a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncTrigger {
    /// New link from the UI
    Link,
    /// Manual refresh
    Refresh,
    /// Aggregator webhook
    Webhook,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Link => "LINK",
            SyncTrigger::Refresh => "REFRESH",
            SyncTrigger::Webhook => "WEBHOOK",
        }
    }
}

impl FromStr for SyncTrigger {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "LINK" => Ok(SyncTrigger::Link),
            "REFRESH" => Ok(SyncTrigger::Refresh),
            "WEBHOOK" => Ok(SyncTrigger::Webhook),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown sync trigger '{}'",
                other
            )))),
        }
    }
}

/// Status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncJobStatus {
    /// Recorded, not started
    #[default]
    Pending,
    /// In progress
    Running,
    /// Committed
    Done,
    /// Error occurred, nothing from this attempt was kept
    Failed,
}

impl SyncJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncJobStatus::Pending => "PENDING",
            SyncJobStatus::Running => "RUNNING",
            SyncJobStatus::Done => "DONE",
            SyncJobStatus::Failed => "FAILED",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SyncJobStatus::Done | SyncJobStatus::Failed)
    }
}

impl FromStr for SyncJobStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SyncJobStatus::Pending),
            "RUNNING" => Ok(SyncJobStatus::Running),
            "DONE" => Ok(SyncJobStatus::Done),
            "FAILED" => Ok(SyncJobStatus::Failed),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown sync job status '{}'",
                other
            )))),
        }
    }
}

/// Represents a single link/refresh/webhook sync attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: String,
    /// Known once the institution is resolved
    pub institution_id: Option<String>,
    pub item_id: Option<String>,
    pub trigger: SyncTrigger,
    pub mode: Option<SyncMode>,
    pub status: SyncJobStatus,
    /// Last stage reached
    pub stage: LinkStage,
    pub accounts_upserted: u32,
    pub transactions_added: u32,
    pub transactions_modified: u32,
    pub transactions_removed: u32,
    /// Error message if failed
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    /// Create a pending job
    pub fn new(trigger: SyncTrigger) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            institution_id: None,
            item_id: None,
            trigger,
            mode: None,
            status: SyncJobStatus::Pending,
            stage: LinkStage::Started,
            accounts_upserted: 0,
            transactions_added: 0,
            transactions_modified: 0,
            transactions_removed: 0,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn for_institution(mut self, institution_id: impl Into<String>) -> Self {
        self.institution_id = Some(institution_id.into());
        self
    }

    pub fn start(&mut self) {
        self.status = SyncJobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Records progress. Stages never move backwards.
    pub fn advance(&mut self, stage: LinkStage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    /// Mark the job as committed
    pub fn complete(&mut self, summary: &ReconcileSummary) {
        self.status = SyncJobStatus::Done;
        self.stage = LinkStage::Committed;
        self.accounts_upserted = summary.accounts.total();
        self.transactions_added = summary.transactions_added;
        self.transactions_modified = summary.transactions_modified;
        self.transactions_removed = summary.transactions_removed;
        self.error = None;
        self.finished_at = Some(Utc::now());
    }

    /// Mark the job as failed
    pub fn fail(&mut self, error: String) {
        self.status = SyncJobStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }
}

/// Trait for SyncJob persistence operations.
///
/// Jobs are written outside any sync transaction so a rolled back attempt
/// is still on record.
#[async_trait]
pub trait SyncJobRepositoryTrait: Send + Sync {
    async fn create(&self, job: SyncJob) -> Result<SyncJob>;

    async fn update(&self, job: SyncJob) -> Result<SyncJob>;

    fn get(&self, id: &str) -> Result<Option<SyncJob>>;

    /// Most recent jobs first
    fn list_for_institution(&self, institution_id: &str, limit: i64) -> Result<Vec<SyncJob>>;

    /// Marks every unfinished job failed. Called at startup, when no sync can
    /// still be running. Returns the number of jobs changed.
    async fn fail_unfinished(&self, reason: &str) -> Result<usize>;
}
