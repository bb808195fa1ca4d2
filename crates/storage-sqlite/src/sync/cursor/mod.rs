//! SQLite storage implementation for sync cursors.

mod model;
mod repository;

pub use model::SyncCursorDB;
pub use repository::CursorRepository;

pub(crate) use repository::save_cursor;
