//! Classification module - user mappings and override rules that decide the
//! category and group stored for each transaction.

mod mapping_model;
mod mapping_traits;
mod override_rules;

pub use mapping_model::*;
pub use mapping_traits::MappingRepositoryTrait;
pub use override_rules::*;
