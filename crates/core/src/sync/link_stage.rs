//! Stages of a link or sync attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// Progress of one attempt, in order.
///
/// Nothing is written locally before the commit. `InstitutionSaved` records
/// that the institution was resolved and staged for the batch, not that a
/// row exists. `Persisted`, `CursorSaved` and `Committed` are reached
/// together when the batch transaction commits; a failure before that
/// leaves no local writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkStage {
    Started,
    TokenExchanged,
    InstitutionSaved,
    AccountsFetched,
    TransactionsFetched,
    Persisted,
    CursorSaved,
    Committed,
}

impl LinkStage {
    pub const ALL: [LinkStage; 8] = [
        LinkStage::Started,
        LinkStage::TokenExchanged,
        LinkStage::InstitutionSaved,
        LinkStage::AccountsFetched,
        LinkStage::TransactionsFetched,
        LinkStage::Persisted,
        LinkStage::CursorSaved,
        LinkStage::Committed,
    ];

    pub fn next(self) -> Option<LinkStage> {
        let idx = LinkStage::ALL.iter().position(|s| *s == self)?;
        LinkStage::ALL.get(idx + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStage::Started => "STARTED",
            LinkStage::TokenExchanged => "TOKEN_EXCHANGED",
            LinkStage::InstitutionSaved => "INSTITUTION_SAVED",
            LinkStage::AccountsFetched => "ACCOUNTS_FETCHED",
            LinkStage::TransactionsFetched => "TRANSACTIONS_FETCHED",
            LinkStage::Persisted => "PERSISTED",
            LinkStage::CursorSaved => "CURSOR_SAVED",
            LinkStage::Committed => "COMMITTED",
        }
    }
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkStage::ALL
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| {
                Error::Validation(ValidationError::InvalidInput(format!(
                    "Unknown link stage '{}'",
                    s
                )))
            })
    }
}
