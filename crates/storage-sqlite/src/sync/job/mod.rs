//! SQLite storage implementation for tracked sync jobs.

mod model;
mod repository;

pub use model::SyncJobDB;
pub use repository::SyncJobRepository;
