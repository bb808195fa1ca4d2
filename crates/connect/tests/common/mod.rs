#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use ledgerlink_connect::aggregator::{
    AggregatorApiClient, RetryConfig, SyncConfig, SyncPage, TrackedAggregatorClient,
    TransactionsPage,
};
use ledgerlink_connect::LinkOrchestrator;
use ledgerlink_core::accounts::{AccountSnapshot, AccountType, Balances, Liabilities};
use ledgerlink_core::classification::OverrideRules;
use ledgerlink_core::errors::{AggregatorError, Error, Result};
use ledgerlink_core::institutions::{ExchangedToken, InstitutionHealth, InstitutionSnapshot};
use ledgerlink_core::transactions::{TransactionChanges, TransactionSnapshot};
use ledgerlink_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, AccountRepository, ApiCallLogRepository,
    CursorRepository, DbPool, InstitutionRepository, SqliteSyncStore, SyncJobRepository,
    TransactionRepository,
};

// ─────────────────────────────────────────────────────────────────────────────
// Scripted aggregator
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded call to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exchange(String),
    Metadata(String),
    Accounts(String),
    Liabilities(String),
    Sync {
        cursor: Option<String>,
        days_requested: Option<u32>,
    },
    Get {
        offset: u32,
    },
    Remove(String),
    FireWebhook(String),
}

#[derive(Default)]
struct Script {
    exchanges: HashMap<String, ExchangedToken>,
    institutions: HashMap<String, InstitutionSnapshot>,
    accounts: HashMap<String, Vec<AccountSnapshot>>,
    history: HashMap<String, Vec<TransactionSnapshot>>,
    sync_pages: HashMap<(String, String), SyncPage>,
    history_error: Option<AggregatorError>,
    sync_error: Option<AggregatorError>,
    accounts_error: Option<AggregatorError>,
    liabilities_error: Option<AggregatorError>,
    calls: Vec<Call>,
}

/// In-memory aggregator driven by a script. Clones share the script.
#[derive(Clone, Default)]
pub struct MockAggregator {
    script: Arc<Mutex<Script>>,
}

fn not_scripted(what: &str) -> Error {
    AggregatorError::permanent("NOT_SCRIPTED", format!("No scripted response for {}", what))
        .into()
}

impl MockAggregator {
    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap();
        f(&mut script)
    }

    /// Scripts a public token exchange and the item's institution.
    pub fn item(&self, public_token: &str, access_token: &str, institution: InstitutionSnapshot) {
        self.with(|s| {
            s.exchanges.insert(
                public_token.to_string(),
                ExchangedToken {
                    access_token: access_token.to_string(),
                    item_id: institution.item_id.clone(),
                },
            );
            s.institutions
                .insert(access_token.to_string(), institution);
        });
    }

    pub fn accounts(&self, access_token: &str, accounts: Vec<AccountSnapshot>) {
        self.with(|s| {
            s.accounts.insert(access_token.to_string(), accounts);
        });
    }

    pub fn history(&self, access_token: &str, transactions: Vec<TransactionSnapshot>) {
        self.with(|s| {
            s.history.insert(access_token.to_string(), transactions);
        });
    }

    /// Scripts the page returned for `cursor` (`None` for a cursorless sync).
    pub fn sync_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        changes: TransactionChanges,
        next_cursor: &str,
        has_more: bool,
    ) {
        self.with(|s| {
            s.sync_pages.insert(
                (access_token.to_string(), cursor.unwrap_or("").to_string()),
                SyncPage {
                    changes,
                    next_cursor: next_cursor.to_string(),
                    has_more,
                },
            );
        });
    }

    pub fn fail_history(&self, err: AggregatorError) {
        self.with(|s| s.history_error = Some(err));
    }

    pub fn fail_sync(&self, err: AggregatorError) {
        self.with(|s| s.sync_error = Some(err));
    }

    pub fn fail_accounts(&self, err: AggregatorError) {
        self.with(|s| s.accounts_error = Some(err));
    }

    pub fn fail_liabilities(&self, err: AggregatorError) {
        self.with(|s| s.liabilities_error = Some(err));
    }

    pub fn clear_failures(&self) {
        self.with(|s| {
            s.history_error = None;
            s.sync_error = None;
            s.accounts_error = None;
            s.liabilities_error = None;
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn reset_calls(&self) {
        self.with(|s| s.calls.clear());
    }

    pub fn get_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Get { .. }))
            .count()
    }

    pub fn sync_cursors(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Sync { cursor, .. } => Some(cursor),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Remove(token) => Some(token),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AggregatorApiClient for MockAggregator {
    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken> {
        self.with(|s| {
            s.calls.push(Call::Exchange(public_token.to_string()));
            s.exchanges
                .get(public_token)
                .cloned()
                .ok_or_else(|| not_scripted("exchange"))
        })
    }

    async fn get_institution_metadata(&self, access_token: &str) -> Result<InstitutionSnapshot> {
        self.with(|s| {
            s.calls.push(Call::Metadata(access_token.to_string()));
            s.institutions
                .get(access_token)
                .cloned()
                .ok_or_else(|| not_scripted("institution"))
        })
    }

    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSnapshot>> {
        self.with(|s| {
            s.calls.push(Call::Accounts(access_token.to_string()));
            if let Some(err) = &s.accounts_error {
                return Err(err.clone().into());
            }
            s.accounts
                .get(access_token)
                .cloned()
                .ok_or_else(|| not_scripted("accounts"))
        })
    }

    async fn list_liabilities(&self, access_token: &str) -> Result<Liabilities> {
        self.with(|s| {
            s.calls.push(Call::Liabilities(access_token.to_string()));
            if let Some(err) = &s.liabilities_error {
                return Err(err.clone().into());
            }
            Ok(Liabilities::default())
        })
    }

    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        _count: u32,
        days_requested: Option<u32>,
    ) -> Result<SyncPage> {
        self.with(|s| {
            s.calls.push(Call::Sync {
                cursor: cursor.map(str::to_string),
                days_requested,
            });
            if let Some(err) = &s.sync_error {
                return Err(err.clone().into());
            }
            s.sync_pages
                .get(&(access_token.to_string(), cursor.unwrap_or("").to_string()))
                .cloned()
                .ok_or_else(|| not_scripted("sync page"))
        })
    }

    async fn get_transactions_page(
        &self,
        access_token: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
        offset: u32,
        count: u32,
    ) -> Result<TransactionsPage> {
        self.with(|s| {
            s.calls.push(Call::Get { offset });
            if let Some(err) = &s.history_error {
                return Err(err.clone().into());
            }
            let all = s
                .history
                .get(access_token)
                .ok_or_else(|| not_scripted("history"))?;
            Ok(TransactionsPage {
                transactions: all
                    .iter()
                    .skip(offset as usize)
                    .take(count as usize)
                    .cloned()
                    .collect(),
                total_transactions: all.len() as u32,
            })
        })
    }

    async fn remove_item(&self, access_token: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::Remove(access_token.to_string()));
            Ok(())
        })
    }

    async fn fire_test_webhook(&self, access_token: &str, _webhook_code: &str) -> Result<()> {
        self.with(|s| {
            s.calls.push(Call::FireWebhook(access_token.to_string()));
            Ok(())
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness over real SQLite storage
// ─────────────────────────────────────────────────────────────────────────────

pub struct Harness {
    _dir: TempDir,
    pub pool: Arc<DbPool>,
    pub aggregator: MockAggregator,
    pub orchestrator: LinkOrchestrator,
    pub institutions: Arc<InstitutionRepository>,
    pub cursors: Arc<CursorRepository>,
    pub store: Arc<SqliteSyncStore>,
    pub jobs: Arc<SyncJobRepository>,
    pub api_calls: Arc<ApiCallLogRepository>,
    pub accounts: AccountRepository,
    pub transactions: TransactionRepository,
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_path = init(db_path.to_str().unwrap()).unwrap();
    let pool = create_pool(&db_path).unwrap();
    run_migrations(&pool).unwrap();
    let writer = spawn_writer((*pool).clone());

    let aggregator = MockAggregator::default();
    let institutions = Arc::new(InstitutionRepository::new(pool.clone(), writer.clone()));
    let cursors = Arc::new(CursorRepository::new(pool.clone(), writer.clone()));
    let store = Arc::new(SqliteSyncStore::new(
        pool.clone(),
        writer.clone(),
        OverrideRules::new(),
    ));
    let jobs = Arc::new(SyncJobRepository::new(pool.clone(), writer.clone()));
    let api_calls = Arc::new(ApiCallLogRepository::new(pool.clone(), writer.clone()));

    let client = Arc::new(TrackedAggregatorClient::new(
        aggregator.clone(),
        api_calls.clone(),
    ));
    let orchestrator = LinkOrchestrator::new(
        client,
        institutions.clone(),
        cursors.clone(),
        store.clone(),
        jobs.clone(),
    )
    .with_config(
        SyncConfig {
            history_days: 730,
            page_size: 20,
            max_pages: 50,
        },
        RetryConfig::immediate(3),
    );

    Harness {
        _dir: dir,
        accounts: AccountRepository::new(pool.clone()),
        transactions: TransactionRepository::new(pool.clone()),
        pool,
        aggregator,
        orchestrator,
        institutions,
        cursors,
        store,
        jobs,
        api_calls,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

pub fn institution(id: &str, item_id: &str) -> InstitutionSnapshot {
    InstitutionSnapshot {
        id: id.to_string(),
        name: format!("Bank {}", id),
        oauth: false,
        products: vec!["transactions".to_string()],
        health: InstitutionHealth::Healthy,
        item_id: item_id.to_string(),
    }
}

pub fn account(id: &str, account_type: AccountType) -> AccountSnapshot {
    AccountSnapshot {
        external_id: id.to_string(),
        name: format!("Account {}", id),
        official_name: None,
        mask: Some("1234".to_string()),
        account_type,
        subtype: None,
        balances: Balances {
            current: Some(Decimal::new(250_00, 2)),
            available: Some(Decimal::new(200_00, 2)),
            limit: None,
            iso_currency_code: Some("USD".to_string()),
        },
    }
}

pub fn txn(id: &str, account_id: &str, amount: Decimal) -> TransactionSnapshot {
    TransactionSnapshot {
        external_id: id.to_string(),
        account_id: account_id.to_string(),
        amount,
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        authorized_date: None,
        authorized_datetime: None,
        name: format!("Merchant {}", id),
        merchant_name: None,
        payment_channel: Some("online".to_string()),
        category: Some("GENERAL_MERCHANDISE".to_string()),
        group: None,
        pending: false,
        iso_currency_code: Some("USD".to_string()),
    }
}

/// `n` transactions spread over the given accounts, ids `{prefix}-{i}`.
pub fn txns(prefix: &str, n: usize, accounts: &[&str]) -> Vec<TransactionSnapshot> {
    (0..n)
        .map(|i| {
            txn(
                &format!("{}-{}", prefix, i),
                accounts[i % accounts.len()],
                Decimal::new(i as i64 * 100 + 99, 2),
            )
        })
        .collect()
}

/// Scripts institution `id` with three accounts, `history` transactions of
/// history and a cursorless sync that only returns `cursor`.
pub fn script_new_institution(
    h: &Harness,
    id: &str,
    public_token: &str,
    history: usize,
    cursor: &str,
) -> String {
    let access = format!("access-{}", public_token);
    let item = format!("item-{}", public_token);
    let account_ids = [
        format!("{}-chk", id),
        format!("{}-sav", id),
        format!("{}-card", id),
    ];
    h.aggregator
        .item(public_token, &access, institution(id, &item));
    h.aggregator.accounts(
        &access,
        vec![
            account(&account_ids[0], AccountType::Depository),
            account(&account_ids[1], AccountType::Depository),
            account(&account_ids[2], AccountType::Credit),
        ],
    );
    let refs: Vec<&str> = account_ids.iter().map(String::as_str).collect();
    h.aggregator.history(&access, txns(id, history, &refs));
    h.aggregator
        .sync_page(&access, None, TransactionChanges::default(), cursor, false);
    access
}
