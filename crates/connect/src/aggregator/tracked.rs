//! Audit decorator recording every aggregator call.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::warn;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use ledgerlink_core::accounts::{AccountSnapshot, Liabilities};
use ledgerlink_core::errors::Result;
use ledgerlink_core::institutions::{ExchangedToken, InstitutionSnapshot};
use ledgerlink_core::sync::{ApiCallLogRepositoryTrait, ApiCallRecord};

use super::models::{SyncPage, TransactionsPage};
use super::traits::AggregatorApiClient;

/// Wraps an [`AggregatorApiClient`] and writes one audit record per call.
///
/// A failed audit write is logged and never changes the call's outcome.
pub struct TrackedAggregatorClient<C> {
    inner: C,
    log: Arc<dyn ApiCallLogRepositoryTrait>,
}

impl<C: AggregatorApiClient> TrackedAggregatorClient<C> {
    pub fn new(inner: C, log: Arc<dyn ApiCallLogRepositoryTrait>) -> Self {
        Self { inner, log }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn track<T, Fut>(
        &self,
        product: &str,
        operation: &str,
        call: Fut,
        describe: impl Fn(&T) -> (Option<String>, Option<i64>),
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = call.await;
        let elapsed = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        let mut record = ApiCallRecord {
            product: product.to_string(),
            operation: operation.to_string(),
            item_id: None,
            response_time_ms: elapsed,
            success: result.is_ok(),
            error_code: None,
            error_message: None,
            items_retrieved: None,
            called_at: Utc::now(),
        };
        match &result {
            Ok(value) => {
                let (item_id, items) = describe(value);
                record.item_id = item_id;
                record.items_retrieved = items;
            }
            Err(err) => {
                record.error_code = err.as_aggregator().map(|e| e.code.clone());
                record.error_message = Some(err.to_string());
            }
        }

        if let Err(e) = self.log.record(record).await {
            warn!(
                "Failed to record aggregator call {}/{}: {}",
                product, operation, e
            );
        }
        result
    }
}

fn nothing<T>(_: &T) -> (Option<String>, Option<i64>) {
    (None, None)
}

#[async_trait]
impl<C: AggregatorApiClient> AggregatorApiClient for TrackedAggregatorClient<C> {
    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken> {
        self.track(
            "item",
            "exchange",
            self.inner.exchange_public_token(public_token),
            |t: &ExchangedToken| (Some(t.item_id.clone()), None),
        )
        .await
    }

    async fn get_institution_metadata(&self, access_token: &str) -> Result<InstitutionSnapshot> {
        self.track(
            "institutions",
            "get",
            self.inner.get_institution_metadata(access_token),
            |i: &InstitutionSnapshot| (Some(i.item_id.clone()), Some(1)),
        )
        .await
    }

    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSnapshot>> {
        self.track(
            "accounts",
            "get",
            self.inner.list_accounts(access_token),
            |a: &Vec<AccountSnapshot>| (None, Some(a.len() as i64)),
        )
        .await
    }

    async fn list_liabilities(&self, access_token: &str) -> Result<Liabilities> {
        self.track(
            "liabilities",
            "get",
            self.inner.list_liabilities(access_token),
            |l: &Liabilities| (None, Some((l.credit.len() + l.loans.len()) as i64)),
        )
        .await
    }

    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        count: u32,
        days_requested: Option<u32>,
    ) -> Result<SyncPage> {
        self.track(
            "transactions",
            "sync",
            self.inner
                .sync_transactions_page(access_token, cursor, count, days_requested),
            |p: &SyncPage| {
                let c = &p.changes;
                (
                    None,
                    Some((c.added.len() + c.modified.len() + c.removed.len()) as i64),
                )
            },
        )
        .await
    }

    async fn get_transactions_page(
        &self,
        access_token: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        offset: u32,
        count: u32,
    ) -> Result<TransactionsPage> {
        self.track(
            "transactions",
            "get",
            self.inner
                .get_transactions_page(access_token, start_date, end_date, offset, count),
            |p: &TransactionsPage| (None, Some(p.transactions.len() as i64)),
        )
        .await
    }

    async fn remove_item(&self, access_token: &str) -> Result<()> {
        self.track(
            "item",
            "remove",
            self.inner.remove_item(access_token),
            nothing,
        )
        .await
    }

    async fn fire_test_webhook(&self, access_token: &str, webhook_code: &str) -> Result<()> {
        self.track(
            "sandbox",
            "fire_webhook",
            self.inner.fire_test_webhook(access_token, webhook_code),
            nothing,
        )
        .await
    }
}
