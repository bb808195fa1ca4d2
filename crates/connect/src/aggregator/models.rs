//! Results returned by the aggregator adapter.

use serde::{Deserialize, Serialize};

use ledgerlink_core::transactions::{TransactionChanges, TransactionSnapshot};

/// One page of the cursor-based sync endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPage {
    pub changes: TransactionChanges,
    pub next_cursor: String,
    pub has_more: bool,
}

/// One page of the date-ranged history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPage {
    pub transactions: Vec<TransactionSnapshot>,
    /// Total number of transactions in the requested window.
    pub total_transactions: u32,
}

/// Accumulated output of a paginated sync run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncedChanges {
    pub changes: TransactionChanges,
    /// Cursor from the last page.
    pub next_cursor: String,
    pub pages: usize,
}

/// How the full-history path obtained its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistorySource {
    /// Paged history followed by a cursorless sync to obtain a cursor.
    HistoryAndSync,
    /// History kept failing; a cursorless sync supplied everything.
    SyncFallback,
}

/// Output of the full-history path.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedHistory {
    pub changes: TransactionChanges,
    pub next_cursor: Option<String>,
    pub source: HistorySource,
}
