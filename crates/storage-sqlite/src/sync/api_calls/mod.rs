//! SQLite storage implementation for the aggregator API call log.

mod model;
mod repository;

pub use model::{ApiCallDB, NewApiCallDB};
pub use repository::ApiCallLogRepository;
