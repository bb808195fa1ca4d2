//! SQLite storage implementation for category and group mappings.

mod model;
mod repository;

pub use model::{CategoryMappingDB, GroupMappingDB};
pub use repository::MappingRepository;

pub(crate) use repository::load_mappings;
