//! SQLite storage implementation for sync: cursors, jobs, the API call log,
//! the reconciliation engine and the atomic sync store.

pub mod api_calls;
pub mod cursor;
pub mod job;
pub mod reconcile;
pub mod store;

pub use api_calls::ApiCallLogRepository;
pub use cursor::CursorRepository;
pub use job::SyncJobRepository;
pub use reconcile::apply_batch;
pub use store::SqliteSyncStore;
