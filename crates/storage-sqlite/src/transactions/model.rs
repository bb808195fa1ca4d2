//! Database model for transactions.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::error;
use serde::{Deserialize, Serialize};

use ledgerlink_core::classification::Classification;
use ledgerlink_core::transactions::{Transaction, TransactionSnapshot};

use crate::utils::{
    date_to_text, decimal_to_text, opt_date_to_text, parse_decimal, parse_opt_date,
    parse_opt_timestamp, parse_timestamp, timestamp_to_text,
};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub account_id: String,
    pub amount: String,
    pub posted_date: String,
    pub authorized_date: Option<String>,
    pub authorized_datetime: Option<String>,
    pub name: String,
    pub merchant_name: Option<String>,
    pub payment_channel: Option<String>,
    pub category: Option<String>,
    pub group_name: Option<String>,
    pub pending: bool,
    pub iso_currency_code: Option<String>,
    pub pulled_at: String,
    pub sync_job_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TransactionDB {
    /// Builds the row for a snapshot with its already resolved classification.
    pub fn from_snapshot(
        snapshot: &TransactionSnapshot,
        classification: Classification,
        pulled_at: &DateTime<Utc>,
        sync_job_id: &str,
    ) -> Self {
        let now = timestamp_to_text(&Utc::now());
        Self {
            id: snapshot.external_id.clone(),
            account_id: snapshot.account_id.clone(),
            amount: decimal_to_text(&snapshot.amount),
            posted_date: date_to_text(&snapshot.date),
            authorized_date: opt_date_to_text(snapshot.authorized_date),
            authorized_datetime: snapshot.authorized_datetime.as_ref().map(timestamp_to_text),
            name: snapshot.name.clone(),
            merchant_name: snapshot.merchant_name.clone(),
            payment_channel: snapshot.payment_channel.clone(),
            category: classification.category,
            group_name: classification.group,
            pending: snapshot.pending,
            iso_currency_code: snapshot.iso_currency_code.clone(),
            pulled_at: timestamp_to_text(pulled_at),
            sync_job_id: Some(sync_job_id.to_string()),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl From<TransactionDB> for Transaction {
    fn from(db: TransactionDB) -> Self {
        let date = parse_opt_date(Some(&db.posted_date), "posted_date").unwrap_or_else(|| {
            error!("Transaction {} has no valid posted date", db.id);
            NaiveDate::default()
        });

        Self {
            amount: parse_decimal(&db.amount, "amount"),
            date,
            authorized_date: parse_opt_date(db.authorized_date.as_deref(), "authorized_date"),
            authorized_datetime: parse_opt_timestamp(
                db.authorized_datetime.as_deref(),
                "authorized_datetime",
            ),
            pulled_at: parse_timestamp(&db.pulled_at, "pulled_at"),
            created_at: parse_timestamp(&db.created_at, "created_at"),
            updated_at: parse_timestamp(&db.updated_at, "updated_at"),
            id: db.id,
            account_id: db.account_id,
            name: db.name,
            merchant_name: db.merchant_name,
            payment_channel: db.payment_channel,
            category: db.category,
            group: db.group_name,
            pending: db.pending,
            iso_currency_code: db.iso_currency_code,
            sync_job_id: db.sync_job_id,
        }
    }
}
