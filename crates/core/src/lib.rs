//! Ledgerlink Core - domain entities and traits for institution linking
//! and transaction synchronization.
//!
//! This crate is database-agnostic. It defines the models and repository
//! traits that are implemented by the `storage-sqlite` crate and consumed
//! by the `connect` crate.

pub mod accounts;
pub mod classification;
pub mod errors;
pub mod institutions;
pub mod sync;
pub mod transactions;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
