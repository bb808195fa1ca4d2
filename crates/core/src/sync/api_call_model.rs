//! Audit records for aggregator API calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// One call to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallRecord {
    /// Vendor product, e.g. `transactions`, `accounts`, `item`.
    pub product: String,
    /// Operation within the product, e.g. `sync`, `get`, `exchange`.
    pub operation: String,
    pub item_id: Option<String>,
    pub response_time_ms: i64,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub items_retrieved: Option<i64>,
    pub called_at: DateTime<Utc>,
}

#[async_trait]
pub trait ApiCallLogRepositoryTrait: Send + Sync {
    async fn record(&self, record: ApiCallRecord) -> Result<()>;

    /// Most recent calls first
    fn recent(&self, limit: i64) -> Result<Vec<ApiCallRecord>>;
}
