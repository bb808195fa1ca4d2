//! SQLite storage implementation for transactions.

mod model;
mod repository;

pub use model::TransactionDB;
pub use repository::TransactionRepository;

pub(crate) use repository::{delete_transactions, upsert_transaction};
