use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use ledgerlink_connect::{PlaidConfig, PlaidEnvironment, RetryConfig, SyncConfig};

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow_origins: Vec<String>,
    pub request_timeout: Duration,
    pub plaid: PlaidConfig,
    /// HMAC secret for incoming webhooks. Webhooks are rejected when unset.
    pub webhook_secret: Option<String>,
    /// Public base URL of this server.
    pub app_url: Option<String>,
    pub retry: RetryConfig,
    pub sync: SyncConfig,
    /// JSON file with account override rules.
    pub classification_rules: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let listen_addr = env_or("LL_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("LL_LISTEN_ADDR must be a socket address")?;
        let db_path = env_or("LL_DB_PATH", "./db/app.db");
        let cors_allow_origins = env_or("LL_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let request_timeout = Duration::from_millis(parse_env("LL_REQUEST_TIMEOUT_MS", 30_000)?);

        let environment = PlaidEnvironment::from_str(&env_or("PLAID_ENV", "sandbox"))?;
        let plaid = PlaidConfig {
            client_id: env_or("PLAID_CLIENT_ID", ""),
            secret: env_or("PLAID_SECRET", ""),
            environment,
            timeout: Duration::from_secs(parse_env("LL_AGGREGATOR_TIMEOUT_SECS", 30)?),
            base_url: None,
        };

        let retry = RetryConfig {
            max_attempts: parse_env("LL_FULL_FETCH_MAX_ATTEMPTS", 3)?,
            initial_delay: Duration::from_millis(parse_env("LL_FULL_FETCH_INITIAL_DELAY_MS", 2_000)?),
            ..RetryConfig::default()
        };
        let sync = SyncConfig {
            history_days: parse_env("LL_HISTORY_DAYS", 730)?,
            ..SyncConfig::default()
        };

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow_origins,
            request_timeout,
            plaid,
            webhook_secret: env_opt("PLAID_WEBHOOK_SECRET"),
            app_url: env_opt("LL_APP_URL").map(|u| u.trim_end_matches('/').to_string()),
            retry,
            sync,
            classification_rules: env_opt("LL_CLASSIFICATION_RULES").map(PathBuf::from),
        })
    }

    /// Webhook endpoint the aggregator should call, when the public URL is known.
    pub fn webhook_url(&self) -> Option<String> {
        self.app_url
            .as_ref()
            .map(|base| format!("{}/api/v1/webhook", base))
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
