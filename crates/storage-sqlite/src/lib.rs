//! SQLite storage implementation for LedgerLink.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository and store traits defined in `ledgerlink-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Diesel migrations
//! - Repository implementations for institutions, accounts, transactions,
//!   mappings, cursors, sync jobs and the API call log
//! - The reconciliation engine that applies a sync batch in one transaction
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! All other crates (`core`, `connect`) are database-agnostic and work with traits.
//!
//! ```text
//! core (domain)          connect (sync)
//!       │                      │
//!       └──────────┬───────────┘
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod accounts;
pub mod institutions;
pub mod mappings;
pub mod sync;
pub mod transactions;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export repositories
pub use accounts::AccountRepository;
pub use institutions::InstitutionRepository;
pub use mappings::MappingRepository;
pub use sync::{ApiCallLogRepository, CursorRepository, SqliteSyncStore, SyncJobRepository};
pub use transactions::TransactionRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from ledgerlink-core for convenience
pub use ledgerlink_core::errors::{DatabaseError, Error, Result};
