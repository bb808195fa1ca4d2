use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use ledgerlink_core::errors::Result;
use ledgerlink_core::transactions::{Transaction, TransactionRepositoryTrait};

use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::{accounts, transactions};
use crate::utils::chunk_for_sqlite;

use super::model::TransactionDB;

pub struct TransactionRepository {
    pool: Arc<DbPool>,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl TransactionRepositoryTrait for TransactionRepository {
    fn get(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;

        let row = transactions::table
            .find(transaction_id)
            .select(TransactionDB::as_select())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(row.map(Transaction::from))
    }

    /// Newest first.
    fn list_for_institution(&self, institution_id: &str) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = transactions::table
            .inner_join(accounts::table)
            .filter(accounts::institution_id.eq(institution_id))
            .select(TransactionDB::as_select())
            .order((transactions::posted_date.desc(), transactions::id.asc()))
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }
}

/// Upserts a transaction by external id. Every field is overwritten except
/// `created_at`; the row's category and group are expected to be resolved
/// already.
pub(crate) fn upsert_transaction(conn: &mut SqliteConnection, row: &TransactionDB) -> Result<()> {
    diesel::insert_into(transactions::table)
        .values(row)
        .on_conflict(transactions::id)
        .do_update()
        .set((
            transactions::account_id.eq(&row.account_id),
            transactions::amount.eq(&row.amount),
            transactions::posted_date.eq(&row.posted_date),
            transactions::authorized_date.eq(&row.authorized_date),
            transactions::authorized_datetime.eq(&row.authorized_datetime),
            transactions::name.eq(&row.name),
            transactions::merchant_name.eq(&row.merchant_name),
            transactions::payment_channel.eq(&row.payment_channel),
            transactions::category.eq(&row.category),
            transactions::group_name.eq(&row.group_name),
            transactions::pending.eq(row.pending),
            transactions::iso_currency_code.eq(&row.iso_currency_code),
            transactions::pulled_at.eq(&row.pulled_at),
            transactions::sync_job_id.eq(&row.sync_job_id),
            transactions::updated_at.eq(&row.updated_at),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

/// Hard-deletes transactions by external id, limited to the accounts of one
/// institution. Returns the rows removed.
pub(crate) fn delete_transactions(
    conn: &mut SqliteConnection,
    institution_id: &str,
    ids: &[String],
) -> Result<usize> {
    let mut deleted = 0;
    for chunk in chunk_for_sqlite(ids) {
        let owned_accounts = accounts::table
            .filter(accounts::institution_id.eq(institution_id))
            .select(accounts::id);
        deleted += diesel::delete(
            transactions::table
                .filter(transactions::id.eq_any(chunk))
                .filter(transactions::account_id.eq_any(owned_accounts)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
    }
    Ok(deleted)
}
