//! Per-institution sync cursor models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};
use crate::Result;

/// Status of an institution's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CursorStatus {
    /// No usable cursor; the next sync is a full resync.
    #[default]
    Pending,
    /// A sync committed with this cursor.
    Completed,
}

impl CursorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorStatus::Pending => "PENDING",
            CursorStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for CursorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CursorStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(CursorStatus::Pending),
            "COMPLETED" => Ok(CursorStatus::Completed),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown cursor status '{}'",
                other
            )))),
        }
    }
}

/// Whether a sync fetches the full history or resumes from a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "FULL",
            SyncMode::Incremental => "INCREMENTAL",
        }
    }
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "FULL" => Ok(SyncMode::Full),
            "INCREMENTAL" => Ok(SyncMode::Incremental),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown sync mode '{}'",
                other
            )))),
        }
    }
}

/// Opaque watermark for one institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCursor {
    pub institution_id: String,
    /// `None` forces a full resync.
    pub cursor: Option<String>,
    pub status: CursorStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub first_sync_at: Option<DateTime<Utc>>,
}

impl SyncCursor {
    /// Returns the cursor to resume from, if there is one.
    pub fn resumable(&self) -> Option<&str> {
        self.cursor
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn mode(&self) -> SyncMode {
        if self.resumable().is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::Full
        }
    }
}

/// Persistence for per-institution cursors.
#[async_trait]
pub trait CursorRepositoryTrait: Send + Sync {
    fn get(&self, institution_id: &str) -> Result<Option<SyncCursor>>;

    /// Stores a cursor as completed. Sync code advances cursors through
    /// `SyncStoreTrait::commit_batch` instead, so the cursor commits with its data.
    async fn set(&self, institution_id: &str, cursor: &str) -> Result<()>;

    /// Clears the cursor and marks it pending, forcing a full resync.
    async fn reset(&self, institution_id: &str) -> Result<()>;
}
