//! Outcomes reported by the link orchestrator.

use serde::{Deserialize, Serialize};

use ledgerlink_core::sync::{ReconcileSummary, SyncMode, UnlinkSummary};

/// Result of a committed link, refresh or webhook sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub job_id: String,
    pub institution_id: String,
    pub institution_name: String,
    pub mode: SyncMode,
    pub summary: ReconcileSummary,
}

/// Result of an unlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkOutcome {
    pub institution_id: String,
    /// Whether the aggregator confirmed the credential revocation.
    pub revoked: bool,
    pub deleted: UnlinkSummary,
}
