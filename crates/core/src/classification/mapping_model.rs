//! Category and group mapping models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which classification field a mapping overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappingKind {
    Category,
    Group,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKind::Category => f.write_str("category"),
            MappingKind::Group => f.write_str("group"),
        }
    }
}

/// A user correction keyed by transaction display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub transaction_name: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Which existing transactions a new mapping is applied to right away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", tag = "scope", content = "transactionId")]
pub enum MappingApply {
    /// Every stored transaction with the mapped name.
    AllWithName,
    /// Only the given transaction.
    Single(String),
    /// Only future syncs.
    #[default]
    None,
}
