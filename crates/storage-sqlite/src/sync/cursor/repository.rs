//! Repository for sync cursor persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, info};
use std::sync::Arc;

use ledgerlink_core::errors::{Error, Result};
use ledgerlink_core::sync::{CursorRepositoryTrait, CursorStatus, SyncCursor};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{institutions, sync_cursors};
use crate::utils::timestamp_to_text;

use super::model::SyncCursorDB;

pub struct CursorRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CursorRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl CursorRepositoryTrait for CursorRepository {
    fn get(&self, institution_id: &str) -> Result<Option<SyncCursor>> {
        let mut conn = get_connection(&self.pool)?;
        let row = find_cursor(&mut conn, institution_id)?;
        Ok(row.map(SyncCursor::from))
    }

    async fn set(&self, institution_id: &str, cursor: &str) -> Result<()> {
        let institution_id = institution_id.to_string();
        let cursor = cursor.to_string();
        self.writer
            .exec(move |conn| {
                let exists = institutions::table
                    .find(&institution_id)
                    .select(institutions::id)
                    .first::<String>(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .is_some();
                if !exists {
                    return Err(Error::NotFound(format!(
                        "Institution {} not found",
                        institution_id
                    )));
                }
                save_cursor(conn, &institution_id, Some(&cursor), &Utc::now())
            })
            .await
    }

    async fn reset(&self, institution_id: &str) -> Result<()> {
        let institution_id = institution_id.to_string();
        self.writer
            .exec(move |conn| reset_cursor(conn, &institution_id))
            .await
    }
}

fn find_cursor(conn: &mut SqliteConnection, institution_id: &str) -> Result<Option<SyncCursorDB>> {
    Ok(sync_cursors::table
        .find(institution_id)
        .select(SyncCursorDB::as_select())
        .first::<SyncCursorDB>(conn)
        .optional()
        .map_err(StorageError::from)?)
}

/// Records the outcome of a sync inside the caller's transaction.
///
/// With a cursor the row becomes `COMPLETED`. Without one it is kept (or
/// created) as `PENDING` with no cursor, so the next sync runs in full.
/// `first_sync_at` is set once and never changed.
pub(crate) fn save_cursor(
    conn: &mut SqliteConnection,
    institution_id: &str,
    cursor: Option<&str>,
    synced_at: &DateTime<Utc>,
) -> Result<()> {
    let existing = find_cursor(conn, institution_id)?;
    let now = timestamp_to_text(synced_at);

    let cursor = cursor.map(str::trim).filter(|c| !c.is_empty());
    let status = if cursor.is_some() {
        CursorStatus::Completed
    } else {
        CursorStatus::Pending
    };

    let row = SyncCursorDB {
        institution_id: institution_id.to_string(),
        cursor: cursor.map(str::to_string),
        status: status.as_str().to_string(),
        last_sync_at: Some(now.clone()),
        first_sync_at: existing
            .and_then(|e| e.first_sync_at)
            .or(Some(now)),
    };

    diesel::insert_into(sync_cursors::table)
        .values(&row)
        .on_conflict(sync_cursors::institution_id)
        .do_update()
        .set(&row)
        .execute(conn)
        .map_err(StorageError::from)?;

    debug!(
        "Cursor for {} saved as {}",
        institution_id,
        status.as_str()
    );
    Ok(())
}

/// Clears the cursor so the next sync runs in full.
pub(crate) fn reset_cursor(conn: &mut SqliteConnection, institution_id: &str) -> Result<()> {
    let updated = diesel::update(sync_cursors::table.find(institution_id))
        .set((
            sync_cursors::cursor.eq(None::<String>),
            sync_cursors::status.eq(CursorStatus::Pending.as_str()),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

    if updated > 0 {
        info!("Cursor for {} reset; next sync will be full", institution_id);
    }
    Ok(())
}
