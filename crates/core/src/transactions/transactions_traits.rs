//! Transaction repository traits.

use super::transactions_model::Transaction;
use crate::errors::Result;

/// Read access to stored transactions.
///
/// Writes go through `SyncStoreTrait::commit_batch` so that transactions,
/// removals and the cursor always move together.
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get(&self, transaction_id: &str) -> Result<Option<Transaction>>;

    /// Lists an institution's transactions, newest first.
    fn list_for_institution(&self, institution_id: &str) -> Result<Vec<Transaction>>;
}
