//! Account repository traits.
//!
//! Accounts are written only through a sync batch, so the repository
//! surface is read-only.

use super::accounts_model::Account;
use crate::errors::Result;

/// Trait defining read access to stored accounts.
pub trait AccountRepositoryTrait: Send + Sync {
    /// Retrieves an account with its balance extension.
    fn get(&self, account_id: &str) -> Result<Option<Account>>;

    /// Lists the accounts of one institution, ordered by name.
    fn list_for_institution(&self, institution_id: &str) -> Result<Vec<Account>>;
}
