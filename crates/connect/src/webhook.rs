//! Aggregator webhook verification and parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC of the raw body.
pub const SIGNATURE_HEADER: &str = "Plaid-Verification";

/// Webhook code that announces new transaction data.
pub const SYNC_UPDATES_AVAILABLE: &str = "SYNC_UPDATES_AVAILABLE";

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Webhook secret is not configured")]
    SecretNotConfigured,

    #[error("Missing Plaid-Verification header")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Computes the hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex HMAC-SHA256 signature over the raw body in constant time.
pub fn verify_signature(secret: &str, body: &[u8], header_hex: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let expected = sign(secret, body);
    let provided = header_hex.trim().to_ascii_lowercase();

    if expected.len() != provided.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Checks the signature, distinguishing the reasons for rejection.
pub fn authenticate(
    secret: Option<&str>,
    body: &[u8],
    header_hex: Option<&str>,
) -> Result<(), WebhookError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::SecretNotConfigured)?;
    let header = header_hex.ok_or(WebhookError::MissingSignature)?;
    if verify_signature(secret, body, header) {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    webhook_type: Option<String>,
    webhook_code: Option<String>,
    item_id: Option<String>,
    #[serde(default)]
    error: Option<WebhookErrorBody>,
}

#[derive(Debug, Deserialize)]
struct WebhookErrorBody {
    error_code: Option<String>,
}

/// What a webhook asks the sync subsystem to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// New transaction data is available for the item.
    TransactionsUpdate { item_id: String },
    /// The item entered an error state, e.g. the login expired.
    ItemError { item_id: String, code: String },
    /// Anything this service does not act on.
    Ignored {
        webhook_type: String,
        webhook_code: String,
    },
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;
        let webhook_type = payload.webhook_type.unwrap_or_default();
        let webhook_code = payload.webhook_code.unwrap_or_default();

        let event = match (webhook_type.as_str(), webhook_code.as_str(), payload.item_id) {
            ("TRANSACTIONS", SYNC_UPDATES_AVAILABLE, Some(item_id)) => {
                WebhookEvent::TransactionsUpdate { item_id }
            }
            ("ITEM", "ERROR", Some(item_id)) => WebhookEvent::ItemError {
                item_id,
                code: payload
                    .error
                    .and_then(|e| e.error_code)
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
            },
            _ => WebhookEvent::Ignored {
                webhook_type: webhook_type.clone(),
                webhook_code: webhook_code.clone(),
            },
        };
        Ok(event)
    }
}
