//! Accounts module - domain models and traits.

mod accounts_model;
mod accounts_traits;

#[cfg(test)]
mod accounts_model_tests;

// Re-export the public interface
pub use accounts_model::*;
pub use accounts_traits::AccountRepositoryTrait;
