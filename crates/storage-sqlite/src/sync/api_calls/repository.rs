//! Repository for the aggregator API call log.

use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use ledgerlink_core::errors::Result;
use ledgerlink_core::sync::{ApiCallLogRepositoryTrait, ApiCallRecord};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::aggregator_api_calls;

use super::model::{ApiCallDB, NewApiCallDB};

pub struct ApiCallLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ApiCallLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl ApiCallLogRepositoryTrait for ApiCallLogRepository {
    async fn record(&self, record: ApiCallRecord) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let row: NewApiCallDB = record.into();
                diesel::insert_into(aggregator_api_calls::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    /// Most recent first.
    fn recent(&self, limit: i64) -> Result<Vec<ApiCallRecord>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = aggregator_api_calls::table
            .select(ApiCallDB::as_select())
            .order(aggregator_api_calls::id.desc())
            .limit(limit)
            .load::<ApiCallDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(ApiCallRecord::from).collect())
    }
}
