//! Sync domain models and traits: cursors, the staged sync batch, tracked
//! sync jobs and the aggregator call audit log.

mod api_call_model;
mod link_stage;
mod sync_batch_model;
mod sync_cursor_model;
mod sync_job_model;

pub use api_call_model::*;
pub use link_stage::LinkStage;
pub use sync_batch_model::*;
pub use sync_cursor_model::*;
pub use sync_job_model::*;
