//! Reconciliation engine: merges one staged sync batch into the store.
//!
//! Everything here runs on the caller's connection and inside the caller's
//! transaction. Any error leaves the transaction to be rolled back, so a
//! batch is either fully applied or not at all.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};

use ledgerlink_core::accounts::AccountUpsertCounts;
use ledgerlink_core::classification::{
    resolve_classification, Classification, ClassificationContext, OverrideRules,
};
use ledgerlink_core::errors::{Error, Result, ValidationError};
use ledgerlink_core::sync::{ReconcileSummary, SyncBatch};
use ledgerlink_core::transactions::TransactionSnapshot;

use crate::accounts::{delete_accounts_except, upsert_account};
use crate::errors::StorageError;
use crate::institutions::{stored_item_id, upsert_credential, upsert_institution};
use crate::mappings::load_mappings;
use crate::schema::accounts;
use crate::sync::cursor::save_cursor;
use crate::transactions::{delete_transactions, upsert_transaction, TransactionDB};
use crate::utils::chunk_for_sqlite;

/// Applies a batch: institution and credential, accounts with their balance
/// extensions, classified transactions, removals, then the cursor.
///
/// When the batch's credential replaces a different item, accounts of the
/// institution that the batch does not report are deleted with their data.
pub fn apply_batch(
    conn: &mut SqliteConnection,
    batch: &SyncBatch,
    rules: &OverrideRules,
) -> Result<ReconcileSummary> {
    let institution_id = batch.institution_id();

    upsert_institution(conn, &batch.institution, &batch.pulled_at)?;
    let mut replaced_item = None;
    if let Some(token) = &batch.credential {
        let previous = stored_item_id(conn, institution_id)?;
        if previous.as_deref().is_some_and(|item| item != token.item_id) {
            replaced_item = previous;
        }
        upsert_credential(conn, institution_id, token)?;
    }

    let mut counts = AccountUpsertCounts::default();
    for account in &batch.accounts {
        upsert_account(
            conn,
            account,
            institution_id,
            &batch.liabilities,
            &batch.pulled_at,
            &batch.job_id,
        )?;
        counts.record(&account.account_type);
    }
    debug!(
        "Upserted {} account(s) for institution {}",
        counts.total(),
        institution_id
    );

    // A new item issues new account ids; the old item's accounts go with it.
    if let Some(old_item) = replaced_item {
        let keep: Vec<String> = batch.accounts.iter().map(|a| a.external_id.clone()).collect();
        let dropped = delete_accounts_except(conn, institution_id, &keep)?;
        info!(
            "Institution {} moved from item {}: removed {} account(s) it no longer reports",
            institution_id, old_item, dropped
        );
    }

    let account_names = load_account_names(conn, batch.changes.upserts())?;
    if let Some(orphan) = batch
        .changes
        .upserts()
        .find(|t| !account_names.contains_key(&t.account_id))
    {
        return Err(Error::Validation(ValidationError::UnknownAccount {
            transaction_id: orphan.external_id.clone(),
            account_id: orphan.account_id.clone(),
        }));
    }

    let names: Vec<String> = batch
        .changes
        .upserts()
        .map(|t| t.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mapped = load_mappings(conn, &names)?;

    for txn in batch.changes.upserts() {
        let classification = classify(txn, &account_names, &mapped, rules);
        let row = TransactionDB::from_snapshot(txn, classification, &batch.pulled_at, &batch.job_id);
        upsert_transaction(conn, &row)?;
    }

    let removed = delete_transactions(conn, institution_id, &batch.changes.removed)?;

    save_cursor(
        conn,
        institution_id,
        batch.next_cursor.as_deref(),
        &batch.pulled_at,
    )?;

    let summary = ReconcileSummary {
        institution_id: institution_id.to_string(),
        accounts: counts,
        transactions_added: len_u32(batch.changes.added.len()),
        transactions_modified: len_u32(batch.changes.modified.len()),
        transactions_removed: len_u32(removed),
        cursor: batch.next_cursor.clone(),
    };

    info!(
        "Reconciled institution {} ({:?}): {} accounts, {} added, {} modified, {} removed",
        institution_id,
        batch.mode,
        summary.accounts.total(),
        summary.transactions_added,
        summary.transactions_modified,
        summary.transactions_removed
    );
    Ok(summary)
}

fn classify(
    txn: &TransactionSnapshot,
    account_names: &HashMap<String, String>,
    mapped: &HashMap<String, Classification>,
    rules: &OverrideRules,
) -> Classification {
    let vendor = Classification::new(txn.category.clone(), txn.group.clone());
    let mapping = mapped.get(&txn.name).cloned().unwrap_or_default();
    let ctx = ClassificationContext {
        account_id: &txn.account_id,
        account_name: account_names.get(&txn.account_id).map(String::as_str),
        transaction_name: &txn.name,
    };
    resolve_classification(vendor, mapping, &ctx, rules)
}

/// Names of the stored accounts referenced by the given transactions. The
/// batch's own accounts are already written at this point.
fn load_account_names<'a>(
    conn: &mut SqliteConnection,
    txns: impl Iterator<Item = &'a TransactionSnapshot>,
) -> Result<HashMap<String, String>> {
    let ids: Vec<String> = txns
        .map(|t| t.account_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut names = HashMap::with_capacity(ids.len());
    for chunk in chunk_for_sqlite(&ids) {
        let rows = accounts::table
            .filter(accounts::id.eq_any(chunk))
            .select((accounts::id, accounts::name))
            .load::<(String, String)>(conn)
            .map_err(StorageError::from)?;
        names.extend(rows);
    }
    Ok(names)
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
