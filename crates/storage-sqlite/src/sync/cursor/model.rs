//! Database model for per-institution sync cursors.

use diesel::prelude::*;
use log::error;
use std::str::FromStr;

use ledgerlink_core::sync::{CursorStatus, SyncCursor};

use crate::utils::parse_opt_timestamp;

#[derive(Queryable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_cursors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(institution_id))]
#[diesel(treat_none_as_null = true)]
pub struct SyncCursorDB {
    pub institution_id: String,
    pub cursor: Option<String>,
    pub status: String,
    pub last_sync_at: Option<String>,
    pub first_sync_at: Option<String>,
}

impl From<SyncCursorDB> for SyncCursor {
    fn from(db: SyncCursorDB) -> Self {
        let status = CursorStatus::from_str(&db.status).unwrap_or_else(|e| {
            error!("Invalid cursor status for {}: {}", db.institution_id, e);
            CursorStatus::Pending
        });
        Self {
            last_sync_at: parse_opt_timestamp(db.last_sync_at.as_deref(), "last_sync_at"),
            first_sync_at: parse_opt_timestamp(db.first_sync_at.as_deref(), "first_sync_at"),
            institution_id: db.institution_id,
            cursor: db.cursor,
            status,
        }
    }
}
