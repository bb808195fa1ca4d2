//! Institutions module - linked institutions, their credentials and health.

mod institutions_model;
mod institutions_traits;

pub use institutions_model::*;
pub use institutions_traits::InstitutionRepositoryTrait;
