//! Pagination over the sync and history endpoints.

use chrono::{Days, NaiveDate, Utc};
use log::{debug, info, warn};

use ledgerlink_core::errors::{Error, Result};
use ledgerlink_core::transactions::TransactionChanges;

use super::models::{FetchedHistory, HistorySource, SyncedChanges};
use super::retry::{with_backoff, RetryConfig};
use super::traits::AggregatorApiClient;

/// Configuration for fetching transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Window of the full-history fetch, and of a cursorless sync.
    pub history_days: u32,
    /// Items per page (the vendor caps sync pages at 500).
    pub page_size: u32,
    /// Hard limit on pages per run.
    pub max_pages: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_days: 730,
            page_size: 500,
            max_pages: 1_000,
        }
    }
}

/// Calls the sync endpoint while `has_more` is set, accumulating every page.
///
/// Only the last page's cursor is kept. Without a cursor the endpoint is
/// asked for `history_days` of history, which makes the run a full sync.
pub async fn sync_all_pages(
    client: &dyn AggregatorApiClient,
    access_token: &str,
    cursor: Option<&str>,
    config: &SyncConfig,
) -> Result<SyncedChanges> {
    let days_requested = if cursor.is_none() {
        Some(config.history_days)
    } else {
        None
    };
    let mut current = cursor.map(str::to_string);
    let mut out = SyncedChanges::default();

    loop {
        if out.pages >= config.max_pages {
            return Err(Error::Unexpected(format!(
                "Pagination exceeded max pages ({}). Aborting.",
                config.max_pages
            )));
        }

        let page = client
            .sync_transactions_page(
                access_token,
                current.as_deref(),
                config.page_size,
                days_requested,
            )
            .await?;
        out.pages += 1;

        debug!(
            "Sync page {}: {} added, {} modified, {} removed, has_more={}",
            out.pages,
            page.changes.added.len(),
            page.changes.modified.len(),
            page.changes.removed.len(),
            page.has_more
        );

        out.changes.merge_page(page.changes);

        if page.has_more && current.as_deref() == Some(page.next_cursor.as_str()) {
            return Err(Error::Unexpected(
                "Pagination appears stuck (same cursor returned for multiple pages).".to_string(),
            ));
        }
        out.next_cursor = page.next_cursor;

        if !page.has_more {
            break;
        }
        current = Some(out.next_cursor.clone());
    }

    info!(
        "Synced {} pages: {} added, {} modified, {} removed",
        out.pages,
        out.changes.added.len(),
        out.changes.modified.len(),
        out.changes.removed.len()
    );
    Ok(out)
}

/// Pages through the history endpoint for the configured window.
async fn get_all_history(
    client: &dyn AggregatorApiClient,
    access_token: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    config: &SyncConfig,
) -> Result<TransactionChanges> {
    let mut changes = TransactionChanges::default();
    let mut offset: u32 = 0;
    let mut pages: usize = 0;

    loop {
        if pages >= config.max_pages {
            return Err(Error::Unexpected(format!(
                "Pagination exceeded max pages ({}). Aborting.",
                config.max_pages
            )));
        }

        let page = client
            .get_transactions_page(access_token, start_date, end_date, offset, config.page_size)
            .await?;
        pages += 1;

        let received = page.transactions.len() as u32;
        offset += received;
        changes.added.extend(page.transactions);

        if received == 0 || offset >= page.total_transactions {
            break;
        }
    }

    debug!(
        "Fetched {} historical transactions in {} pages",
        changes.added.len(),
        pages
    );
    Ok(changes)
}

/// Fetches the complete history of a freshly linked item.
///
/// The date-ranged history is retried with backoff while the aggregator
/// reports a retryable error. A cursorless sync then supplies the cursor and
/// any newer changes. If every history attempt fails with a retryable error,
/// the cursorless sync alone is used. Any other error is returned unchanged.
pub async fn fetch_full_history(
    client: &dyn AggregatorApiClient,
    access_token: &str,
    config: &SyncConfig,
    retry: &RetryConfig,
) -> Result<FetchedHistory> {
    let end_date = Utc::now().date_naive();
    let start_date = end_date
        .checked_sub_days(Days::new(u64::from(config.history_days)))
        .unwrap_or(end_date);

    let history = with_backoff(retry, "Full history fetch", || {
        get_all_history(client, access_token, start_date, end_date, config)
    })
    .await;

    match history {
        Ok(history) => {
            info!(
                "Fetched {} transactions of history ({} -> {}), bootstrapping cursor",
                history.added.len(),
                start_date,
                end_date
            );
            let synced = sync_all_pages(client, access_token, None, config).await?;
            Ok(FetchedHistory {
                changes: history.merge_newer(synced.changes),
                next_cursor: Some(synced.next_cursor),
                source: HistorySource::HistoryAndSync,
            })
        }
        Err(err) if err.as_aggregator().is_some_and(|e| e.is_retryable()) => {
            warn!(
                "Full history fetch exhausted {} attempts ({}). Falling back to cursorless sync",
                retry.max_attempts, err
            );
            let synced = sync_all_pages(client, access_token, None, config).await?;
            Ok(FetchedHistory {
                changes: synced.changes,
                next_cursor: Some(synced.next_cursor),
                source: HistorySource::SyncFallback,
            })
        }
        Err(err) => Err(err),
    }
}
