//! Aggregator Client Adapter: the vendor API contract, its HTTP client,
//! pagination and retry helpers, and the call audit decorator.

mod client;
mod fetch;
mod models;
mod retry;
mod tracked;
mod traits;

pub use client::{PlaidApiClient, PlaidConfig, PlaidEnvironment, DEFAULT_TIMEOUT_SECS};
pub use fetch::{fetch_full_history, sync_all_pages, SyncConfig};
pub use models::{FetchedHistory, HistorySource, SyncPage, SyncedChanges, TransactionsPage};
pub use retry::{with_backoff, RetryConfig};
pub use tracked::TrackedAggregatorClient;
pub use traits::AggregatorApiClient;
