//! Utility functions for SQLite storage operations.
//!
//! Chunking helpers keep `IN (...)` queries under SQLite's parameter limit.
//! Text helpers convert between domain types and the TEXT columns used for
//! amounts, dates and timestamps.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite's default SQLITE_MAX_VARIABLE_NUMBER is 999; 500 leaves room for
/// the other parameters of the statement.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into slices of at most `SQLITE_MAX_PARAMS_CHUNK` items.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn timestamp_to_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn date_to_text(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn decimal_to_text(value: &Decimal) -> String {
    value.normalize().to_string()
}

pub fn opt_decimal_to_text(value: Option<Decimal>) -> Option<String> {
    value.as_ref().map(decimal_to_text)
}

pub fn opt_date_to_text(value: Option<NaiveDate>) -> Option<String> {
    value.as_ref().map(date_to_text)
}

/// Parses a stored timestamp, falling back to now on malformed data.
pub fn parse_timestamp(value: &str, field_name: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::error!("Failed to parse {} '{}': {}", field_name, value, e);
            Utc::now()
        })
}

pub fn parse_opt_timestamp(value: Option<&str>, field_name: &str) -> Option<DateTime<Utc>> {
    value.map(|v| parse_timestamp(v, field_name))
}

/// Parses a stored date. Malformed data is logged and read as `None`.
pub fn parse_opt_date(value: Option<&str>, field_name: &str) -> Option<NaiveDate> {
    value.and_then(|v| match NaiveDate::parse_from_str(v, DATE_FORMAT) {
        Ok(d) => Some(d),
        Err(e) => {
            log::error!("Failed to parse {} '{}': {}", field_name, v, e);
            None
        }
    })
}

/// Parses a stored decimal, falling back to zero on malformed data.
pub fn parse_decimal(value: &str, field_name: &str) -> Decimal {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .unwrap_or_else(|e| {
            log::error!(
                "Failed to parse {} '{}': {}. Falling back to ZERO.",
                field_name,
                value,
                e
            );
            Decimal::ZERO
        })
}

pub fn parse_opt_decimal(value: Option<&str>, field_name: &str) -> Option<Decimal> {
    value.map(|v| parse_decimal(v, field_name))
}
