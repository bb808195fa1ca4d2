//! Atomic sync store: commits batches and purges unlinked institutions.

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;

use ledgerlink_core::classification::OverrideRules;
use ledgerlink_core::errors::Result;
use ledgerlink_core::sync::{ReconcileSummary, SyncBatch, SyncStoreTrait, UnlinkSummary};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{
    accounts, credit_balances, depository_balances, institutions, investment_balances,
    link_credentials, loan_balances, sync_cursors, transactions,
};

use super::reconcile::apply_batch;

pub struct SqliteSyncStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    rules: OverrideRules,
}

impl SqliteSyncStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, rules: OverrideRules) -> Self {
        Self {
            pool,
            writer,
            rules,
        }
    }
}

#[async_trait]
impl SyncStoreTrait for SqliteSyncStore {
    async fn commit_batch(&self, batch: SyncBatch) -> Result<ReconcileSummary> {
        let rules = self.rules.clone();
        self.writer
            .exec(move |conn| apply_batch(conn, &batch, &rules))
            .await
    }

    fn count_transactions(&self, institution_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;

        let count = transactions::table
            .inner_join(accounts::table)
            .filter(accounts::institution_id.eq(institution_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(count)
    }

    /// Deletes everything stored for an institution in dependency order:
    /// transactions, balance extensions, accounts, cursor, credential and
    /// finally the institution row.
    async fn purge_institution(&self, institution_id: &str) -> Result<UnlinkSummary> {
        let institution_id = institution_id.to_string();
        self.writer
            .exec(move |conn| {
                let owned_accounts = || {
                    accounts::table
                        .filter(accounts::institution_id.eq(&institution_id))
                        .select(accounts::id)
                };
                let mut summary = UnlinkSummary::default();

                summary.transactions = diesel::delete(
                    transactions::table.filter(transactions::account_id.eq_any(owned_accounts())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;

                summary.balance_extensions += diesel::delete(
                    depository_balances::table
                        .filter(depository_balances::account_id.eq_any(owned_accounts())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                summary.balance_extensions += diesel::delete(
                    credit_balances::table
                        .filter(credit_balances::account_id.eq_any(owned_accounts())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                summary.balance_extensions += diesel::delete(
                    loan_balances::table.filter(loan_balances::account_id.eq_any(owned_accounts())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                summary.balance_extensions += diesel::delete(
                    investment_balances::table
                        .filter(investment_balances::account_id.eq_any(owned_accounts())),
                )
                .execute(conn)
                .map_err(StorageError::from)?;

                summary.accounts = diesel::delete(
                    accounts::table.filter(accounts::institution_id.eq(&institution_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;

                summary.cursors = diesel::delete(sync_cursors::table.find(&institution_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                summary.credentials = diesel::delete(link_credentials::table.find(&institution_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                summary.institutions = diesel::delete(institutions::table.find(&institution_id))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                info!(
                    "Purged institution {}: {} transactions, {} balance rows, {} accounts",
                    institution_id, summary.transactions, summary.balance_extensions, summary.accounts
                );
                Ok(summary)
            })
            .await
    }
}
