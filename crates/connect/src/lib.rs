//! Ledgerlink Connect - aggregator integration and sync orchestration.
//!
//! This crate talks to the financial data aggregator and drives the
//! link/refresh/unlink flows. It depends only on the traits from
//! `ledgerlink-core`; storage is injected by the caller.
//!
//! - [`aggregator`]: the API contract, the Plaid HTTP client, pagination,
//!   bounded retries and the call audit decorator
//! - [`webhook`]: signature verification and event parsing
//! - [`link`]: the link orchestrator

pub mod aggregator;
pub mod link;
pub mod webhook;

// Re-export commonly used types
pub use aggregator::{
    AggregatorApiClient, PlaidApiClient, PlaidConfig, PlaidEnvironment, RetryConfig, SyncConfig,
    TrackedAggregatorClient,
};
pub use link::{LinkOrchestrator, SyncOutcome, UnlinkOutcome};
pub use webhook::{verify_signature, WebhookError, WebhookEvent};
