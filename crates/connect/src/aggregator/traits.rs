//! Contract for the financial data aggregator.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::models::{SyncPage, TransactionsPage};
use ledgerlink_core::accounts::{AccountSnapshot, Liabilities};
use ledgerlink_core::errors::Result;
use ledgerlink_core::institutions::{ExchangedToken, InstitutionSnapshot};

/// Trait for calling the aggregator API.
///
/// Implementations classify vendor failures once, into
/// `Error::Aggregator` with a typed kind, and never retry on their own.
#[async_trait]
pub trait AggregatorApiClient: Send + Sync {
    /// Exchange a public token from the link UI for a long-lived credential
    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken>;

    /// Fetch the item's institution, its products and health
    async fn get_institution_metadata(&self, access_token: &str) -> Result<InstitutionSnapshot>;

    /// Fetch all accounts of the item with their balances
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSnapshot>>;

    /// Fetch credit card and loan details
    async fn list_liabilities(&self, access_token: &str) -> Result<Liabilities>;

    /// Fetch one page of the cursor-based sync endpoint.
    ///
    /// `days_requested` only applies when `cursor` is `None`.
    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        count: u32,
        days_requested: Option<u32>,
    ) -> Result<SyncPage>;

    /// Fetch one page of transactions in a date window
    async fn get_transactions_page(
        &self,
        access_token: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        offset: u32,
        count: u32,
    ) -> Result<TransactionsPage>;

    /// Revoke the credential and delete the item on the aggregator side
    async fn remove_item(&self, access_token: &str) -> Result<()>;

    /// Ask a sandbox item to send a transactions webhook
    async fn fire_test_webhook(&self, access_token: &str, webhook_code: &str) -> Result<()>;
}
