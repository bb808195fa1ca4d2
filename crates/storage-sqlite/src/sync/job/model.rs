//! Database model for tracked sync jobs.

use diesel::prelude::*;
use log::error;
use std::str::FromStr;

use ledgerlink_core::sync::{LinkStage, SyncJob, SyncJobStatus, SyncMode, SyncTrigger};

use crate::utils::{parse_opt_timestamp, parse_timestamp, timestamp_to_text};

#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::sync_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct SyncJobDB {
    pub id: String,
    pub institution_id: Option<String>,
    pub item_id: Option<String>,
    pub trigger_type: String,
    pub mode: Option<String>,
    pub status: String,
    pub stage: String,
    pub accounts_upserted: i32,
    pub transactions_added: i32,
    pub transactions_modified: i32,
    pub transactions_removed: i32,
    pub error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

fn count_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn count_from_db(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl From<SyncJob> for SyncJobDB {
    fn from(job: SyncJob) -> Self {
        Self {
            id: job.id,
            institution_id: job.institution_id,
            item_id: job.item_id,
            trigger_type: job.trigger.as_str().to_string(),
            mode: job.mode.map(|m| m.as_str().to_string()),
            status: job.status.as_str().to_string(),
            stage: job.stage.as_str().to_string(),
            accounts_upserted: count_to_db(job.accounts_upserted),
            transactions_added: count_to_db(job.transactions_added),
            transactions_modified: count_to_db(job.transactions_modified),
            transactions_removed: count_to_db(job.transactions_removed),
            error: job.error,
            created_at: timestamp_to_text(&job.created_at),
            started_at: job.started_at.as_ref().map(timestamp_to_text),
            finished_at: job.finished_at.as_ref().map(timestamp_to_text),
        }
    }
}

impl From<SyncJobDB> for SyncJob {
    fn from(db: SyncJobDB) -> Self {
        let trigger = SyncTrigger::from_str(&db.trigger_type).unwrap_or_else(|e| {
            error!("Invalid trigger on sync job {}: {}", db.id, e);
            SyncTrigger::Refresh
        });
        let mode = db.mode.as_deref().and_then(|m| SyncMode::from_str(m).ok());
        let status = SyncJobStatus::from_str(&db.status).unwrap_or_else(|e| {
            error!("Invalid status on sync job {}: {}", db.id, e);
            SyncJobStatus::Failed
        });
        let stage = LinkStage::from_str(&db.stage).unwrap_or(LinkStage::Started);

        Self {
            trigger,
            mode,
            status,
            stage,
            accounts_upserted: count_from_db(db.accounts_upserted),
            transactions_added: count_from_db(db.transactions_added),
            transactions_modified: count_from_db(db.transactions_modified),
            transactions_removed: count_from_db(db.transactions_removed),
            created_at: parse_timestamp(&db.created_at, "created_at"),
            started_at: parse_opt_timestamp(db.started_at.as_deref(), "started_at"),
            finished_at: parse_opt_timestamp(db.finished_at.as_deref(), "finished_at"),
            id: db.id,
            institution_id: db.institution_id,
            item_id: db.item_id,
            error: db.error,
        }
    }
}
