//! Institution domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};
use crate::sync::CursorStatus;

/// Health of an institution connection as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstitutionHealth {
    #[default]
    Healthy,
    /// The aggregator reports the institution as partially available.
    Degraded,
    /// The last sync hit a permanent error (e.g. login required).
    Unhealthy,
}

impl InstitutionHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstitutionHealth::Healthy => "HEALTHY",
            InstitutionHealth::Degraded => "DEGRADED",
            InstitutionHealth::Unhealthy => "UNHEALTHY",
        }
    }
}

impl fmt::Display for InstitutionHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstitutionHealth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HEALTHY" => Ok(InstitutionHealth::Healthy),
            "DEGRADED" => Ok(InstitutionHealth::Degraded),
            "UNHEALTHY" => Ok(InstitutionHealth::Unhealthy),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown institution health '{}'",
                other
            )))),
        }
    }
}

/// A linked financial institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub oauth: bool,
    pub products: Vec<String>,
    pub health: InstitutionHealth,
    /// Last time a sync for this institution committed.
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Institution metadata as returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionSnapshot {
    pub id: String,
    pub name: String,
    pub oauth: bool,
    pub products: Vec<String>,
    pub health: InstitutionHealth,
    /// Item the metadata was fetched for.
    pub item_id: String,
}

impl InstitutionSnapshot {
    pub fn supports(&self, product: &str) -> bool {
        self.products.iter().any(|p| p == product)
    }
}

/// Access credential for one institution, exclusively owned by it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCredential {
    pub institution_id: String,
    pub item_id: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

// Keep access tokens out of logs.
impl fmt::Debug for LinkCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkCredential")
            .field("institution_id", &self.institution_id)
            .field("item_id", &self.item_id)
            .field("access_token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Result of exchanging a public token with the aggregator.
#[derive(Clone, PartialEq)]
pub struct ExchangedToken {
    pub access_token: String,
    pub item_id: String,
}

impl fmt::Debug for ExchangedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangedToken")
            .field("item_id", &self.item_id)
            .finish_non_exhaustive()
    }
}

/// Metadata the link UI hands over alongside the public token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    #[serde(default)]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub institution_name: Option<String>,
    #[serde(default)]
    pub link_session_id: Option<String>,
}

/// List view of an institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionSummary {
    pub id: String,
    pub name: String,
    pub health: InstitutionHealth,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub cursor_status: Option<CursorStatus>,
    pub account_count: i64,
}
