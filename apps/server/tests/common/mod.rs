#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use tower::ServiceExt;

use ledgerlink_connect::aggregator::{SyncPage, TransactionsPage};
use ledgerlink_connect::{AggregatorApiClient, PlaidConfig, RetryConfig, SyncConfig};
use ledgerlink_core::accounts::{AccountSnapshot, AccountType, Balances, Liabilities};
use ledgerlink_core::errors::{AggregatorError, Result};
use ledgerlink_core::institutions::{ExchangedToken, InstitutionHealth, InstitutionSnapshot};
use ledgerlink_core::transactions::{TransactionChanges, TransactionSnapshot};
use ledgerlink_server::{api::app_router, build_state_with_client, config::Config, AppState};

pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const PUBLIC_TOKEN: &str = "public-sandbox-1";
pub const ITEM_ID: &str = "item-1";
pub const INSTITUTION_ID: &str = "ins_109508";

const ACCESS_TOKEN: &str = "access-sandbox-1";

/// One sandbox item with two accounts and a short history.
#[derive(Clone, Default)]
pub struct SandboxAggregator {
    calls: Arc<Mutex<Vec<String>>>,
    pending: Arc<Mutex<Option<TransactionChanges>>>,
    history_delay: Arc<Mutex<Duration>>,
}

impl SandboxAggregator {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Changes the next incremental sync reports. Every later sync from the
    /// same cursor reports them again.
    pub fn queue_changes(&self, changes: TransactionChanges) {
        *self.pending.lock().unwrap() = Some(changes);
    }

    /// Delays every history page by `delay`.
    pub fn slow_history(&self, delay: Duration) {
        *self.history_delay.lock().unwrap() = delay;
    }

    fn check_token(access_token: &str) -> Result<()> {
        if access_token == ACCESS_TOKEN {
            Ok(())
        } else {
            Err(AggregatorError::permanent("INVALID_ACCESS_TOKEN", "unknown access token").into())
        }
    }
}

pub fn snapshot_txn(id: &str, account_id: &str, name: &str) -> TransactionSnapshot {
    TransactionSnapshot {
        external_id: id.to_string(),
        account_id: account_id.to_string(),
        amount: dec!(12.34),
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        authorized_date: None,
        authorized_datetime: None,
        name: name.to_string(),
        merchant_name: None,
        payment_channel: Some("online".to_string()),
        category: Some("GENERAL_MERCHANDISE".to_string()),
        group: Some("GENERAL_MERCHANDISE_OTHER".to_string()),
        pending: false,
        iso_currency_code: Some("USD".to_string()),
    }
}

fn history() -> Vec<TransactionSnapshot> {
    vec![
        snapshot_txn("t-1", "acc-chk", "Coffee Shop"),
        snapshot_txn("t-2", "acc-chk", "Coffee Shop"),
        snapshot_txn("t-3", "acc-card", "Bookstore"),
    ]
}

#[async_trait]
impl AggregatorApiClient for SandboxAggregator {
    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken> {
        self.record("exchange");
        if public_token != PUBLIC_TOKEN {
            return Err(AggregatorError::permanent("INVALID_PUBLIC_TOKEN", "bad token").into());
        }
        Ok(ExchangedToken {
            access_token: ACCESS_TOKEN.to_string(),
            item_id: ITEM_ID.to_string(),
        })
    }

    async fn get_institution_metadata(&self, access_token: &str) -> Result<InstitutionSnapshot> {
        self.record("metadata");
        Self::check_token(access_token)?;
        Ok(InstitutionSnapshot {
            id: INSTITUTION_ID.to_string(),
            name: "Platypus Bank".to_string(),
            oauth: false,
            products: vec!["transactions".to_string()],
            health: InstitutionHealth::Healthy,
            item_id: ITEM_ID.to_string(),
        })
    }

    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSnapshot>> {
        self.record("accounts");
        Self::check_token(access_token)?;
        let account = |id: &str, account_type: AccountType| AccountSnapshot {
            external_id: id.to_string(),
            name: id.to_string(),
            official_name: None,
            mask: Some("0000".to_string()),
            account_type,
            subtype: None,
            balances: Balances {
                current: Some(dec!(100)),
                available: Some(dec!(80)),
                limit: None,
                iso_currency_code: Some("USD".to_string()),
            },
        };
        Ok(vec![
            account("acc-chk", AccountType::Depository),
            account("acc-card", AccountType::Credit),
        ])
    }

    async fn list_liabilities(&self, _access_token: &str) -> Result<Liabilities> {
        self.record("liabilities");
        Ok(Liabilities::default())
    }

    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        _count: u32,
        _days_requested: Option<u32>,
    ) -> Result<SyncPage> {
        self.record("sync");
        Self::check_token(access_token)?;
        let changes = match cursor {
            None => TransactionChanges::default(),
            Some(_) => self.pending.lock().unwrap().clone().unwrap_or_default(),
        };
        Ok(SyncPage {
            changes,
            next_cursor: "cursor-1".to_string(),
            has_more: false,
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
        self.record("get");
        Self::check_token(access_token)?;
        let delay = *self.history_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let all = history();
        Ok(TransactionsPage {
            total_transactions: all.len() as u32,
            transactions: all
                .into_iter()
                .skip(offset as usize)
                .take(count as usize)
                .collect(),
        })
    }

    async fn remove_item(&self, _access_token: &str) -> Result<()> {
        self.record("remove");
        Ok(())
    }

    async fn fire_test_webhook(&self, _access_token: &str, _webhook_code: &str) -> Result<()> {
        self.record("fire_webhook");
        Ok(())
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
    pub state: Arc<AppState>,
    pub aggregator: SandboxAggregator,
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        db_path: dir.path().join("app.db").to_string_lossy().to_string(),
        cors_allow_origins: vec!["*".to_string()],
        request_timeout: Duration::from_secs(30),
        plaid: PlaidConfig::default(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        app_url: Some("https://ledger.example.com".to_string()),
        retry: RetryConfig::immediate(2),
        sync: SyncConfig::default(),
        classification_rules: None,
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    configure(&mut config);
    let aggregator = SandboxAggregator::default();
    let state = build_state_with_client(&config, aggregator.clone())
        .await
        .unwrap();
    TestApp {
        router: app_router(state.clone(), &config),
        state,
        aggregator,
        dir,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        read(response).await
    }

    pub async fn webhook(&self, body: &str, signature: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            request = request.header("Plaid-Verification", signature);
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        read(response).await
    }

    pub async fn link(&self) -> serde_json::Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/link",
                Some(serde_json::json!({
                    "publicToken": PUBLIC_TOKEN,
                    "metadata": { "institutionId": INSTITUTION_ID, "institutionName": "Platypus Bank" }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

async fn read(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, json)
}
