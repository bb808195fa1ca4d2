//! Database models for the aggregator API call log.

use diesel::prelude::*;

use ledgerlink_core::sync::ApiCallRecord;

use crate::utils::{parse_timestamp, timestamp_to_text};

#[derive(Queryable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::aggregator_api_calls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ApiCallDB {
    pub id: i32,
    pub product: String,
    pub operation: String,
    pub item_id: Option<String>,
    pub response_time_ms: i64,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub items_retrieved: Option<i64>,
    pub called_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::aggregator_api_calls)]
pub struct NewApiCallDB {
    pub product: String,
    pub operation: String,
    pub item_id: Option<String>,
    pub response_time_ms: i64,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub items_retrieved: Option<i64>,
    pub called_at: String,
}

impl From<ApiCallRecord> for NewApiCallDB {
    fn from(record: ApiCallRecord) -> Self {
        Self {
            product: record.product,
            operation: record.operation,
            item_id: record.item_id,
            response_time_ms: record.response_time_ms,
            success: record.success,
            error_code: record.error_code,
            error_message: record.error_message,
            items_retrieved: record.items_retrieved,
            called_at: timestamp_to_text(&record.called_at),
        }
    }
}

impl From<ApiCallDB> for ApiCallRecord {
    fn from(db: ApiCallDB) -> Self {
        Self {
            called_at: parse_timestamp(&db.called_at, "called_at"),
            product: db.product,
            operation: db.operation,
            item_id: db.item_id,
            response_time_ms: db.response_time_ms,
            success: db.success,
            error_code: db.error_code,
            error_message: db.error_message,
            items_retrieved: db.items_retrieved,
        }
    }
}
