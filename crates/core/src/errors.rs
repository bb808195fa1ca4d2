//! Core error types for Ledgerlink.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer,
//! and vendor HTTP failures are classified once by the aggregator adapter.

use chrono::ParseError as ChronoParseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the sync subsystem.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Aggregator request failed: {0}")]
    Aggregator(#[from] AggregatorError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns the aggregator error if this error came from the vendor API.
    pub fn as_aggregator(&self) -> Option<&AggregatorError> {
        match self {
            Error::Aggregator(e) => Some(e),
            _ => None,
        }
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Account type '{account_type}' cannot carry a {extension} balance extension")]
    ExtensionMismatch {
        account_type: String,
        extension: String,
    },

    #[error("Transaction {transaction_id} references unknown account {account_id}")]
    UnknownAccount {
        transaction_id: String,
        account_id: String,
    },

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

/// Classification of an aggregator failure.
///
/// Retry decisions are made on this kind alone, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregatorErrorKind {
    /// The upstream is not ready yet or temporarily unavailable.
    Transient,
    /// Invalid token, revoked item, bad request. Never retried.
    Permanent,
    /// The upstream asked us to slow down.
    RateLimited,
}

/// Error codes the vendor uses for data that is still being prepared.
const NOT_READY_CODES: &[&str] = &["PRODUCT_NOT_READY", "ITEM_NOT_READY"];

/// Error codes that indicate a temporary upstream problem.
const TRANSIENT_CODES: &[&str] = &[
    "PRODUCT_NOT_READY",
    "ITEM_NOT_READY",
    "INTERNAL_SERVER_ERROR",
    "PLANNED_MAINTENANCE",
    "INSTITUTION_DOWN",
    "INSTITUTION_NOT_RESPONDING",
];

const RATE_LIMIT_MARKER: &str = "RATE_LIMIT_EXCEEDED";

/// A typed aggregator failure, parsed once from the vendor response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?} aggregator error {code}: {message}")]
pub struct AggregatorError {
    pub kind: AggregatorErrorKind,
    pub code: String,
    pub message: String,
    pub http_status: Option<u16>,
}

impl AggregatorError {
    pub fn new(kind: AggregatorErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            http_status: None,
        }
    }

    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AggregatorErrorKind::Transient, code, message)
    }

    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AggregatorErrorKind::Permanent, code, message)
    }

    pub fn rate_limited(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AggregatorErrorKind::RateLimited, code, message)
    }

    /// Classifies a vendor error response.
    ///
    /// `error_type` and `error_code` are the vendor's own fields. The HTTP
    /// status is used only when the body does not settle the kind.
    pub fn from_vendor(
        http_status: Option<u16>,
        error_type: Option<&str>,
        error_code: Option<&str>,
        message: Option<&str>,
    ) -> Self {
        let code = error_code.unwrap_or("UNKNOWN").to_string();
        let kind = if error_type == Some(RATE_LIMIT_MARKER)
            || error_code == Some(RATE_LIMIT_MARKER)
            || http_status == Some(429)
        {
            AggregatorErrorKind::RateLimited
        } else if error_code.is_some_and(|c| TRANSIENT_CODES.contains(&c))
            || error_type == Some("API_ERROR")
            || http_status.is_some_and(|s| s >= 500)
        {
            AggregatorErrorKind::Transient
        } else {
            AggregatorErrorKind::Permanent
        };

        Self {
            kind,
            code,
            message: message.unwrap_or("no message").to_string(),
            http_status,
        }
    }

    /// Whether a bounded retry may help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            AggregatorErrorKind::Transient | AggregatorErrorKind::RateLimited
        )
    }

    /// Whether the item was linked but its data is still being prepared.
    pub fn is_not_ready(&self) -> bool {
        NOT_READY_CODES.contains(&self.code.as_str())
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == AggregatorErrorKind::Permanent
    }
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
