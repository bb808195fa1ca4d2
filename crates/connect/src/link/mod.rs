//! Link Orchestrator: link, refresh, webhook sync and unlink of institutions.

mod models;
mod orchestrator;

pub use models::{SyncOutcome, UnlinkOutcome};
pub use orchestrator::LinkOrchestrator;
