use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::sync::Arc;

use ledgerlink_core::accounts::{
    Account, AccountRepositoryTrait, AccountSnapshot, AccountType, BalanceExtension, Liabilities,
};
use ledgerlink_core::errors::Result;

use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::{
    accounts, credit_balances, depository_balances, investment_balances, loan_balances,
    transactions,
};
use crate::utils::chunk_for_sqlite;

use super::model::{
    AccountDB, CreditBalanceDB, DepositoryBalanceDB, InvestmentBalanceDB, LoanBalanceDB,
};

/// Read access to stored accounts. Writes go through the sync store.
pub struct AccountRepository {
    pool: Arc<DbPool>,
}

impl AccountRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl AccountRepositoryTrait for AccountRepository {
    fn get(&self, account_id: &str) -> Result<Option<Account>> {
        let mut conn = get_connection(&self.pool)?;

        let row = accounts::table
            .find(account_id)
            .select(AccountDB::as_select())
            .first::<AccountDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        match row {
            Some(row) => {
                let balance = load_balance(&mut conn, &row.id, &row.account_type())?;
                Ok(Some(row.into_domain(balance)))
            }
            None => Ok(None),
        }
    }

    fn list_for_institution(&self, institution_id: &str) -> Result<Vec<Account>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = accounts::table
            .filter(accounts::institution_id.eq(institution_id))
            .select(AccountDB::as_select())
            .order(accounts::name.asc())
            .load::<AccountDB>(&mut conn)
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|row| {
                let balance = load_balance(&mut conn, &row.id, &row.account_type())?;
                Ok(row.into_domain(balance))
            })
            .collect()
    }
}

/// Loads the extension row matching the account's type, if any.
pub(crate) fn load_balance(
    conn: &mut SqliteConnection,
    account_id: &str,
    account_type: &AccountType,
) -> Result<Option<BalanceExtension>> {
    let balance = match account_type {
        AccountType::Depository => depository_balances::table
            .find(account_id)
            .select(DepositoryBalanceDB::as_select())
            .first::<DepositoryBalanceDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .map(BalanceExtension::from),
        AccountType::Credit => credit_balances::table
            .find(account_id)
            .select(CreditBalanceDB::as_select())
            .first::<CreditBalanceDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .map(BalanceExtension::from),
        AccountType::Loan => loan_balances::table
            .find(account_id)
            .select(LoanBalanceDB::as_select())
            .first::<LoanBalanceDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .map(BalanceExtension::from),
        AccountType::Investment => investment_balances::table
            .find(account_id)
            .select(InvestmentBalanceDB::as_select())
            .first::<InvestmentBalanceDB>(conn)
            .optional()
            .map_err(StorageError::from)?
            .map(BalanceExtension::from),
        AccountType::Other(_) => None,
    };
    Ok(balance)
}

/// Upserts one account and its balance extension inside the caller's
/// transaction. `created_at` is kept from the first insert.
pub(crate) fn upsert_account(
    conn: &mut SqliteConnection,
    snapshot: &AccountSnapshot,
    institution_id: &str,
    liabilities: &Liabilities,
    pulled_at: &DateTime<Utc>,
    sync_job_id: &str,
) -> Result<()> {
    let row = AccountDB::from_snapshot(snapshot, institution_id, pulled_at, sync_job_id);

    diesel::insert_into(accounts::table)
        .values(&row)
        .on_conflict(accounts::id)
        .do_update()
        .set((
            accounts::institution_id.eq(&row.institution_id),
            accounts::name.eq(&row.name),
            accounts::official_name.eq(&row.official_name),
            accounts::mask.eq(&row.mask),
            accounts::account_type.eq(&row.account_type),
            accounts::subtype.eq(&row.subtype),
            accounts::currency.eq(&row.currency),
            accounts::pulled_at.eq(&row.pulled_at),
            accounts::sync_job_id.eq(&row.sync_job_id),
            accounts::updated_at.eq(&row.updated_at),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

    match BalanceExtension::for_account(snapshot, liabilities) {
        Some(extension) => write_balance_extension(
            conn,
            &snapshot.external_id,
            &snapshot.account_type,
            &extension,
            &row.pulled_at,
        ),
        None => {
            let stale = delete_balances_except(conn, &snapshot.external_id, None)?;
            if stale > 0 {
                debug!(
                    "Removed {} balance extension row(s) for untyped account {}",
                    stale, snapshot.external_id
                );
            }
            Ok(())
        }
    }
}

/// Writes the extension for an account after checking it matches the
/// account type. A row of another type left over from a type change is
/// removed.
pub(crate) fn write_balance_extension(
    conn: &mut SqliteConnection,
    account_id: &str,
    account_type: &AccountType,
    extension: &BalanceExtension,
    pulled_at: &str,
) -> Result<()> {
    extension.validate_for(account_type)?;

    match extension {
        BalanceExtension::Depository(b) => {
            let row = DepositoryBalanceDB::new(account_id, b, pulled_at);
            diesel::insert_into(depository_balances::table)
                .values(&row)
                .on_conflict(depository_balances::account_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
        }
        BalanceExtension::Credit(b) => {
            let row = CreditBalanceDB::new(account_id, b, pulled_at);
            diesel::insert_into(credit_balances::table)
                .values(&row)
                .on_conflict(credit_balances::account_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
        }
        BalanceExtension::Loan(b) => {
            let row = LoanBalanceDB::new(account_id, b, pulled_at);
            diesel::insert_into(loan_balances::table)
                .values(&row)
                .on_conflict(loan_balances::account_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
        }
        BalanceExtension::Investment(b) => {
            let row = InvestmentBalanceDB::new(account_id, b, pulled_at);
            diesel::insert_into(investment_balances::table)
                .values(&row)
                .on_conflict(investment_balances::account_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map_err(StorageError::from)?;
        }
    }

    let stale = delete_balances_except(conn, account_id, Some(extension.kind()))?;
    if stale > 0 {
        debug!(
            "Account {} changed type, removed {} stale balance row(s)",
            account_id, stale
        );
    }
    Ok(())
}

/// Deletes the account's extension rows in every table except `keep`.
fn delete_balances_except(
    conn: &mut SqliteConnection,
    account_id: &str,
    keep: Option<&str>,
) -> Result<usize> {
    let mut deleted = 0;
    if keep != Some("depository") {
        deleted += diesel::delete(depository_balances::table.find(account_id))
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    if keep != Some("credit") {
        deleted += diesel::delete(credit_balances::table.find(account_id))
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    if keep != Some("loan") {
        deleted += diesel::delete(loan_balances::table.find(account_id))
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    if keep != Some("investment") {
        deleted += diesel::delete(investment_balances::table.find(account_id))
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    Ok(deleted)
}

/// Deletes the accounts of an institution that are not in `keep`, with their
/// transactions and balance extensions. Returns the accounts removed.
pub(crate) fn delete_accounts_except(
    conn: &mut SqliteConnection,
    institution_id: &str,
    keep: &[String],
) -> Result<usize> {
    let stale: Vec<String> = accounts::table
        .filter(accounts::institution_id.eq(institution_id))
        .select(accounts::id)
        .load::<String>(conn)
        .map_err(StorageError::from)?
        .into_iter()
        .filter(|id| !keep.contains(id))
        .collect();

    for chunk in chunk_for_sqlite(&stale) {
        diesel::delete(transactions::table.filter(transactions::account_id.eq_any(chunk)))
            .execute(conn)
            .map_err(StorageError::from)?;
        diesel::delete(
            depository_balances::table.filter(depository_balances::account_id.eq_any(chunk)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
        diesel::delete(credit_balances::table.filter(credit_balances::account_id.eq_any(chunk)))
            .execute(conn)
            .map_err(StorageError::from)?;
        diesel::delete(loan_balances::table.filter(loan_balances::account_id.eq_any(chunk)))
            .execute(conn)
            .map_err(StorageError::from)?;
        diesel::delete(
            investment_balances::table.filter(investment_balances::account_id.eq_any(chunk)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
        diesel::delete(accounts::table.filter(accounts::id.eq_any(chunk)))
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    if !stale.is_empty() {
        debug!(
            "Deleted {} account(s) of institution {} no longer reported",
            stale.len(),
            institution_id
        );
    }
    Ok(stale.len())
}
