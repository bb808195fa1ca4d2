//! Repository for tracked sync jobs.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use log::warn;
use std::sync::Arc;

use ledgerlink_core::errors::{Error, Result};
use ledgerlink_core::sync::{SyncJob, SyncJobRepositoryTrait, SyncJobStatus};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_jobs;
use crate::utils::timestamp_to_text;

use super::model::SyncJobDB;

pub struct SyncJobRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncJobRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SyncJobRepositoryTrait for SyncJobRepository {
    async fn create(&self, job: SyncJob) -> Result<SyncJob> {
        self.writer
            .exec(move |conn| {
                let row: SyncJobDB = job.into();
                diesel::insert_into(sync_jobs::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(row.into())
            })
            .await
    }

    async fn update(&self, job: SyncJob) -> Result<SyncJob> {
        self.writer
            .exec(move |conn| {
                let row: SyncJobDB = job.into();
                let updated = diesel::update(sync_jobs::table.find(&row.id))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("Sync job {} not found", row.id)));
                }
                Ok(row.into())
            })
            .await
    }

    fn get(&self, id: &str) -> Result<Option<SyncJob>> {
        let mut conn = get_connection(&self.pool)?;

        let row = sync_jobs::table
            .find(id)
            .select(SyncJobDB::as_select())
            .first::<SyncJobDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(row.map(SyncJob::from))
    }

    fn list_for_institution(&self, institution_id: &str, limit: i64) -> Result<Vec<SyncJob>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = sync_jobs::table
            .filter(sync_jobs::institution_id.eq(institution_id))
            .select(SyncJobDB::as_select())
            .order((sync_jobs::created_at.desc(), sync_jobs::id.desc()))
            .limit(limit)
            .load::<SyncJobDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(SyncJob::from).collect())
    }

    async fn fail_unfinished(&self, reason: &str) -> Result<usize> {
        let reason = reason.to_string();
        self.writer
            .exec(move |conn| {
                let unfinished = [
                    SyncJobStatus::Pending.as_str(),
                    SyncJobStatus::Running.as_str(),
                ];
                let updated = diesel::update(
                    sync_jobs::table.filter(sync_jobs::status.eq_any(unfinished)),
                )
                .set((
                    sync_jobs::status.eq(SyncJobStatus::Failed.as_str()),
                    sync_jobs::error.eq(Some(reason.as_str())),
                    sync_jobs::finished_at.eq(Some(timestamp_to_text(&Utc::now()))),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
                if updated > 0 {
                    warn!("Marked {} unfinished sync job(s) failed: {}", updated, reason);
                }
                Ok(updated)
            })
            .await
    }
}
