//! Transactions module - aggregator transactions and their stored form.

mod transactions_model;
mod transactions_traits;

pub use transactions_model::*;
pub use transactions_traits::TransactionRepositoryTrait;
