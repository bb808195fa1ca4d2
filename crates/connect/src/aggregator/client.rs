//! HTTP client for the Plaid API.
//!
//! Every endpoint is a JSON `POST` carrying the client id and secret in the
//! body. Vendor failures are parsed once into a typed `AggregatorError`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ledgerlink_core::accounts::{
    AccountSnapshot, AccountType, Apr, Balances, CreditLiability, Liabilities, LoanLiability,
};
use ledgerlink_core::errors::{AggregatorError, Error, Result, ValidationError};
use ledgerlink_core::institutions::{ExchangedToken, InstitutionHealth, InstitutionSnapshot};
use ledgerlink_core::transactions::{TransactionChanges, TransactionSnapshot};

use super::models::{SyncPage, TransactionsPage};
use super::traits::AggregatorApiClient;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SANDBOX_URL: &str = "https://sandbox.plaid.com";
const PRODUCTION_URL: &str = "https://production.plaid.com";

/// Liabilities error codes that only mean the item has nothing to report.
const NO_LIABILITIES_CODES: [&str; 2] = ["NO_LIABILITY_ACCOUNTS", "PRODUCTS_NOT_SUPPORTED"];

/// Which Plaid deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => SANDBOX_URL,
            PlaidEnvironment::Production => PRODUCTION_URL,
        }
    }

    pub fn is_sandbox(&self) -> bool {
        *self == PlaidEnvironment::Sandbox
    }
}

impl fmt::Display for PlaidEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaidEnvironment::Sandbox => f.write_str("sandbox"),
            PlaidEnvironment::Production => f.write_str("production"),
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(PlaidEnvironment::Sandbox),
            "production" => Ok(PlaidEnvironment::Production),
            other => Err(Error::InvalidConfigValue(format!(
                "Unknown Plaid environment '{}', expected sandbox or production",
                other
            ))),
        }
    }
}

/// Credentials and transport settings for [`PlaidApiClient`].
#[derive(Clone)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
    pub timeout: Duration,
    /// Overrides the environment's base URL.
    pub base_url: Option<String>,
}

impl fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("environment", &self.environment)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Default for PlaidConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            secret: String::new(),
            environment: PlaidEnvironment::Sandbox,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            base_url: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Response Types (internal, for parsing vendor responses)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiItemResponse {
    item: ApiItem,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    item_id: String,
    institution_id: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    billed_products: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiInstitutionResponse {
    institution: ApiInstitution,
}

#[derive(Debug, Deserialize)]
struct ApiInstitution {
    institution_id: String,
    name: String,
    #[serde(default)]
    oauth: bool,
    #[serde(default)]
    products: Vec<String>,
    #[serde(default)]
    status: Option<ApiInstitutionStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiInstitutionStatus {
    #[serde(default)]
    transactions_updates: Option<ApiProductStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiProductStatus {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAccountsResponse {
    #[serde(default)]
    accounts: Vec<ApiAccount>,
}

#[derive(Debug, Deserialize)]
struct ApiAccount {
    account_id: String,
    name: String,
    official_name: Option<String>,
    mask: Option<String>,
    #[serde(rename = "type")]
    account_type: String,
    subtype: Option<String>,
    #[serde(default)]
    balances: ApiBalances,
}

#[derive(Debug, Default, Deserialize)]
struct ApiBalances {
    current: Option<Decimal>,
    available: Option<Decimal>,
    limit: Option<Decimal>,
    iso_currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLiabilitiesResponse {
    liabilities: ApiLiabilities,
}

#[derive(Debug, Default, Deserialize)]
struct ApiLiabilities {
    #[serde(default)]
    credit: Option<Vec<ApiCreditLiability>>,
    #[serde(default)]
    student: Option<Vec<ApiLoanLiability>>,
    #[serde(default)]
    mortgage: Option<Vec<ApiMortgageLiability>>,
}

#[derive(Debug, Deserialize)]
struct ApiCreditLiability {
    account_id: Option<String>,
    last_statement_balance: Option<Decimal>,
    last_statement_issue_date: Option<NaiveDate>,
    minimum_payment_amount: Option<Decimal>,
    next_payment_due_date: Option<NaiveDate>,
    #[serde(default)]
    aprs: Vec<ApiApr>,
}

#[derive(Debug, Deserialize)]
struct ApiApr {
    apr_percentage: Option<Decimal>,
    apr_type: Option<String>,
    balance_subject_to_apr: Option<Decimal>,
    interest_charge_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiLoanLiability {
    account_id: Option<String>,
    origination_principal_amount: Option<Decimal>,
    interest_rate_percentage: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiMortgageLiability {
    account_id: Option<String>,
    origination_principal_amount: Option<Decimal>,
    #[serde(default)]
    interest_rate: Option<ApiMortgageRate>,
}

#[derive(Debug, Deserialize)]
struct ApiMortgageRate {
    percentage: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ApiSyncResponse {
    #[serde(default)]
    added: Vec<ApiTransaction>,
    #[serde(default)]
    modified: Vec<ApiTransaction>,
    #[serde(default)]
    removed: Vec<ApiRemovedTransaction>,
    next_cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiRemovedTransaction {
    transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiTransactionsGetResponse {
    #[serde(default)]
    transactions: Vec<ApiTransaction>,
    total_transactions: u32,
}

#[derive(Debug, Deserialize)]
struct ApiTransaction {
    transaction_id: String,
    account_id: String,
    amount: Decimal,
    date: NaiveDate,
    authorized_date: Option<NaiveDate>,
    authorized_datetime: Option<DateTime<Utc>>,
    name: Option<String>,
    merchant_name: Option<String>,
    payment_channel: Option<String>,
    #[serde(default)]
    pending: bool,
    iso_currency_code: Option<String>,
    #[serde(default)]
    personal_finance_category: Option<ApiPersonalFinanceCategory>,
}

#[derive(Debug, Deserialize)]
struct ApiPersonalFinanceCategory {
    primary: Option<String>,
    detailed: Option<String>,
}

impl From<ApiTransaction> for TransactionSnapshot {
    fn from(t: ApiTransaction) -> Self {
        let (category, group) = match t.personal_finance_category {
            Some(pfc) => (pfc.primary, pfc.detailed),
            None => (None, None),
        };
        TransactionSnapshot {
            external_id: t.transaction_id,
            account_id: t.account_id,
            amount: t.amount,
            date: t.date,
            authorized_date: t.authorized_date,
            authorized_datetime: t.authorized_datetime,
            name: t.name.or(t.merchant_name.clone()).unwrap_or_default(),
            merchant_name: t.merchant_name,
            payment_channel: t.payment_channel,
            category,
            group,
            pending: t.pending,
            iso_currency_code: t.iso_currency_code,
        }
    }
}

impl From<ApiAccount> for AccountSnapshot {
    fn from(a: ApiAccount) -> Self {
        AccountSnapshot {
            external_id: a.account_id,
            name: a.name,
            official_name: a.official_name,
            mask: a.mask,
            account_type: AccountType::from(a.account_type),
            subtype: a.subtype,
            balances: Balances {
                current: a.balances.current,
                available: a.balances.available,
                limit: a.balances.limit,
                iso_currency_code: a.balances.iso_currency_code,
            },
        }
    }
}

impl From<ApiLiabilities> for Liabilities {
    fn from(l: ApiLiabilities) -> Self {
        let credit = l
            .credit
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| {
                Some(CreditLiability {
                    account_id: c.account_id?,
                    last_statement_balance: c.last_statement_balance,
                    last_statement_issue_date: c.last_statement_issue_date,
                    minimum_payment_amount: c.minimum_payment_amount,
                    next_payment_due_date: c.next_payment_due_date,
                    aprs: c
                        .aprs
                        .into_iter()
                        .map(|a| Apr {
                            apr_percentage: a.apr_percentage,
                            apr_type: a.apr_type,
                            balance_subject_to_apr: a.balance_subject_to_apr,
                            interest_charge_amount: a.interest_charge_amount,
                        })
                        .collect(),
                })
            })
            .collect();

        let students = l.student.unwrap_or_default().into_iter().filter_map(|s| {
            Some(LoanLiability {
                account_id: s.account_id?,
                origination_principal_amount: s.origination_principal_amount,
                interest_rate_percentage: s.interest_rate_percentage,
            })
        });
        let mortgages = l.mortgage.unwrap_or_default().into_iter().filter_map(|m| {
            Some(LoanLiability {
                account_id: m.account_id?,
                origination_principal_amount: m.origination_principal_amount,
                interest_rate_percentage: m.interest_rate.and_then(|r| r.percentage),
            })
        });

        Liabilities {
            credit,
            loans: students.chain(mortgages).collect(),
        }
    }
}

fn health_from(item_error: Option<&ApiErrorResponse>, status: Option<&str>) -> InstitutionHealth {
    if item_error.is_some_and(|e| e.error_code.is_some()) {
        return InstitutionHealth::Unhealthy;
    }
    match status {
        Some("DEGRADED") | Some("DOWN") => InstitutionHealth::Degraded,
        _ => InstitutionHealth::Healthy,
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    let code = if err.is_timeout() {
        "TIMEOUT"
    } else if err.is_connect() {
        "CONNECTION_FAILED"
    } else {
        "TRANSPORT_ERROR"
    };
    AggregatorError::transient(code, format!("Request failed: {}", err)).into()
}

// ─────────────────────────────────────────────────────────────────────────────
// Plaid API Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the Plaid API.
///
/// # Example
///
/// ```ignore
/// let client = PlaidApiClient::new(PlaidConfig {
///     client_id: "id".into(),
///     secret: "secret".into(),
///     ..Default::default()
/// })?;
/// let token = client.exchange_public_token("public-sandbox-...").await?;
/// ```
#[derive(Clone)]
pub struct PlaidApiClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
    environment: PlaidEnvironment,
}

impl PlaidApiClient {
    /// Create a new Plaid client.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the HTTP client cannot
    /// be initialized.
    pub fn new(config: PlaidConfig) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(ValidationError::MissingField("PLAID_CLIENT_ID".to_string()).into());
        }
        if config.secret.trim().is_empty() {
            return Err(ValidationError::MissingField("PLAID_SECRET".to_string()).into());
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(config.environment.base_url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            client_id: config.client_id,
            secret: config.secret,
            environment: config.environment,
        })
    }

    pub fn environment(&self) -> PlaidEnvironment {
        self.environment
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// POST a JSON body with credentials attached and parse the response.
    async fn post<T: DeserializeOwned>(&self, path: &str, mut body: Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[Plaid] POST {}", url);

        if let Some(obj) = body.as_object_mut() {
            obj.insert("client_id".to_string(), Value::String(self.client_id.clone()));
            obj.insert("secret".to_string(), Value::String(self.secret.clone()));
        }

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        self.parse_response(response).await
    }

    /// Parse an HTTP response, classifying vendor errors.
    async fn parse_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<ApiErrorResponse>(&body).ok();
            let snippet: String = body.chars().take(200).collect();
            let err = AggregatorError::from_vendor(
                Some(status.as_u16()),
                parsed.as_ref().and_then(|e| e.error_type.as_deref()),
                parsed.as_ref().and_then(|e| e.error_code.as_deref()),
                Some(
                    parsed
                        .as_ref()
                        .and_then(|e| e.error_message.as_deref())
                        .unwrap_or(snippet.as_str()),
                ),
            );
            return Err(err.into());
        }

        serde_json::from_str(&body).map_err(|e| {
            AggregatorError::permanent(
                "INVALID_RESPONSE",
                format!(
                    "Failed to parse response: {}. Body: {}",
                    e,
                    body.chars().take(200).collect::<String>()
                ),
            )
            .into()
        })
    }
}

#[async_trait]
impl AggregatorApiClient for PlaidApiClient {
    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken> {
        let resp: ApiExchangeResponse = self
            .post(
                "/item/public_token/exchange",
                json!({ "public_token": public_token }),
            )
            .await?;
        Ok(ExchangedToken {
            access_token: resp.access_token,
            item_id: resp.item_id,
        })
    }

    async fn get_institution_metadata(&self, access_token: &str) -> Result<InstitutionSnapshot> {
        let item: ApiItemResponse = self
            .post("/item/get", json!({ "access_token": access_token }))
            .await?;
        let institution_id = item.item.institution_id.clone().ok_or_else(|| {
            AggregatorError::permanent(
                "INSTITUTION_UNKNOWN",
                format!("Item {} has no institution", item.item.item_id),
            )
        })?;

        let resp: ApiInstitutionResponse = self
            .post(
                "/institutions/get_by_id",
                json!({
                    "institution_id": institution_id,
                    "country_codes": ["US"],
                    "options": { "include_status": true }
                }),
            )
            .await?;
        let inst = resp.institution;
        let products = if item.item.billed_products.is_empty() {
            inst.products
        } else {
            item.item.billed_products.clone()
        };
        let status = inst
            .status
            .as_ref()
            .and_then(|s| s.transactions_updates.as_ref())
            .and_then(|s| s.status.as_deref());

        Ok(InstitutionSnapshot {
            health: health_from(item.item.error.as_ref(), status),
            id: inst.institution_id,
            name: inst.name,
            oauth: inst.oauth,
            products,
            item_id: item.item.item_id,
        })
    }

    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountSnapshot>> {
        let resp: ApiAccountsResponse = self
            .post("/accounts/get", json!({ "access_token": access_token }))
            .await?;
        Ok(resp.accounts.into_iter().map(AccountSnapshot::from).collect())
    }

    async fn list_liabilities(&self, access_token: &str) -> Result<Liabilities> {
        let resp = self
            .post::<ApiLiabilitiesResponse>("/liabilities/get", json!({ "access_token": access_token }))
            .await
            .map(|r| r.liabilities.into());
        liabilities_or_empty(resp)
    }

    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
        count: u32,
        days_requested: Option<u32>,
    ) -> Result<SyncPage> {
        let mut options = json!({
            "include_personal_finance_category": true,
            "include_original_description": true
        });
        let mut body = json!({ "access_token": access_token, "count": count });

        match cursor.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => {
                body["cursor"] = Value::String(c.to_string());
            }
            None => {
                if let Some(days) = days_requested {
                    options["days_requested"] = json!(days);
                }
            }
        }
        body["options"] = options;

        let resp: ApiSyncResponse = self.post("/transactions/sync", body).await?;
        Ok(SyncPage {
            changes: TransactionChanges::new(
                resp.added.into_iter().map(Into::into).collect(),
                resp.modified.into_iter().map(Into::into).collect(),
                resp.removed.into_iter().map(|r| r.transaction_id).collect(),
            ),
            next_cursor: resp.next_cursor,
            has_more: resp.has_more,
        })
    }

    async fn get_transactions_page(
        &self,
        access_token: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        offset: u32,
        count: u32,
    ) -> Result<TransactionsPage> {
        let resp: ApiTransactionsGetResponse = self
            .post(
                "/transactions/get",
                json!({
                    "access_token": access_token,
                    "start_date": start_date.format("%Y-%m-%d").to_string(),
                    "end_date": end_date.format("%Y-%m-%d").to_string(),
                    "options": {
                        "count": count,
                        "offset": offset,
                        "include_personal_finance_category": true
                    }
                }),
            )
            .await?;
        Ok(TransactionsPage {
            transactions: resp.transactions.into_iter().map(Into::into).collect(),
            total_transactions: resp.total_transactions,
        })
    }

    async fn remove_item(&self, access_token: &str) -> Result<()> {
        let _: Value = self
            .post("/item/remove", json!({ "access_token": access_token }))
            .await?;
        Ok(())
    }

    async fn fire_test_webhook(&self, access_token: &str, webhook_code: &str) -> Result<()> {
        if !self.environment.is_sandbox() {
            return Err(ValidationError::InvalidInput(
                "Test webhooks are only available in the sandbox".to_string(),
            )
            .into());
        }
        let _: Value = self
            .post(
                "/sandbox/item/fire_webhook",
                json!({
                    "access_token": access_token,
                    "webhook_type": "TRANSACTIONS",
                    "webhook_code": webhook_code
                }),
            )
            .await?;
        Ok(())
    }
}

/// An item without credit or loan accounts reports no liabilities.
fn liabilities_or_empty(result: Result<Liabilities>) -> Result<Liabilities> {
    match result {
        Err(Error::Aggregator(e)) if NO_LIABILITIES_CODES.contains(&e.code.as_str()) => {
            warn!("[Plaid] No liabilities for item ({}), continuing", e.code);
            Ok(Liabilities::default())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> PlaidConfig {
        PlaidConfig {
            client_id: "client".to_string(),
            secret: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = PlaidApiClient::new(config());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), SANDBOX_URL);
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        let mut cfg = config();
        cfg.secret = "  ".to_string();
        assert!(matches!(
            PlaidApiClient::new(cfg),
            Err(Error::Validation(ValidationError::MissingField(_)))
        ));
    }

    #[test]
    fn test_url_normalization() {
        let mut cfg = config();
        cfg.base_url = Some("http://localhost:9000/".to_string());
        let client = PlaidApiClient::new(cfg).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "Production".parse::<PlaidEnvironment>().unwrap(),
            PlaidEnvironment::Production
        );
        assert_eq!(PlaidEnvironment::Production.base_url(), PRODUCTION_URL);
        assert!("development".parse::<PlaidEnvironment>().is_err());
    }

    #[test]
    fn test_sync_page_parsing() {
        let body = r#"{
            "added": [{
                "transaction_id": "t1",
                "account_id": "acc-1",
                "amount": 12.5,
                "date": "2024-05-01",
                "authorized_date": null,
                "name": "Coffee Shop",
                "merchant_name": "Coffee",
                "payment_channel": "in store",
                "pending": false,
                "iso_currency_code": "USD",
                "personal_finance_category": {"primary": "FOOD_AND_DRINK", "detailed": "FOOD_AND_DRINK_COFFEE"}
            }],
            "modified": [],
            "removed": [{"transaction_id": "t0"}],
            "next_cursor": "c1",
            "has_more": false
        }"#;
        let resp: ApiSyncResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.next_cursor, "c1");
        assert_eq!(resp.removed[0].transaction_id, "t0");

        let txn: TransactionSnapshot = resp.added.into_iter().next().unwrap().into();
        assert_eq!(txn.amount, dec!(12.5));
        assert_eq!(txn.name, "Coffee Shop");
        assert_eq!(txn.category.as_deref(), Some("FOOD_AND_DRINK"));
        assert_eq!(txn.group.as_deref(), Some("FOOD_AND_DRINK_COFFEE"));
    }

    #[test]
    fn test_liabilities_mapping() {
        let body = r#"{
            "credit": [{
                "account_id": "card-1",
                "last_statement_balance": 410.5,
                "last_statement_issue_date": "2024-04-20",
                "minimum_payment_amount": 25,
                "next_payment_due_date": "2024-05-15",
                "aprs": [{"apr_percentage": 19.99, "apr_type": "purchase_apr",
                          "balance_subject_to_apr": 400, "interest_charge_amount": 6.6}]
            }],
            "student": [{"account_id": "loan-1", "origination_principal_amount": 20000,
                         "interest_rate_percentage": 4.5}],
            "mortgage": [{"account_id": "home-1", "origination_principal_amount": 300000,
                          "interest_rate": {"percentage": 3.1, "type": "fixed"}}]
        }"#;
        let api: ApiLiabilities = serde_json::from_str(body).unwrap();
        let liabilities: Liabilities = api.into();

        let card = liabilities.credit_for("card-1").unwrap();
        assert_eq!(card.minimum_payment_amount, Some(dec!(25)));
        assert_eq!(card.aprs[0].apr_percentage, Some(dec!(19.99)));
        assert_eq!(
            liabilities.loan_for("home-1").unwrap().interest_rate_percentage,
            Some(dec!(3.1))
        );
        assert_eq!(liabilities.loans.len(), 2);
    }

    #[test]
    fn test_health_mapping() {
        assert_eq!(health_from(None, Some("HEALTHY")), InstitutionHealth::Healthy);
        assert_eq!(health_from(None, Some("DEGRADED")), InstitutionHealth::Degraded);
        assert_eq!(health_from(None, None), InstitutionHealth::Healthy);
        let err = ApiErrorResponse {
            error_type: Some("ITEM_ERROR".to_string()),
            error_code: Some("ITEM_LOGIN_REQUIRED".to_string()),
            error_message: None,
        };
        assert_eq!(
            health_from(Some(&err), Some("HEALTHY")),
            InstitutionHealth::Unhealthy
        );
    }

    #[test]
    fn test_missing_liability_accounts_are_not_an_error() {
        let no_accounts = AggregatorError::from_vendor(
            Some(400),
            Some("ITEM_ERROR"),
            Some("NO_LIABILITY_ACCOUNTS"),
            Some("no liability accounts"),
        );
        let liabilities = liabilities_or_empty(Err(no_accounts.into())).unwrap();
        assert!(liabilities.credit.is_empty());
        assert!(liabilities.loans.is_empty());

        let login = AggregatorError::from_vendor(
            Some(400),
            Some("ITEM_ERROR"),
            Some("ITEM_LOGIN_REQUIRED"),
            None,
        );
        assert!(liabilities_or_empty(Err(login.into())).is_err());
    }

    #[test]
    fn test_item_reports_billed_products() {
        let body = r#"{
            "item": {
                "item_id": "item-1",
                "institution_id": "ins_1",
                "billed_products": ["transactions"],
                "available_products": ["liabilities"]
            }
        }"#;
        let resp: ApiItemResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.item.billed_products, vec!["transactions".to_string()]);

        let bare: ApiItemResponse =
            serde_json::from_str(r#"{"item": {"item_id": "item-2", "institution_id": null}}"#)
                .unwrap();
        assert!(bare.item.billed_products.is_empty());
    }
}
