//! SQLite storage implementation for institutions and link credentials.

mod model;
mod repository;

pub use model::{InstitutionDB, LinkCredentialDB};
pub use repository::InstitutionRepository;

pub(crate) use repository::{stored_item_id, upsert_credential, upsert_institution};
