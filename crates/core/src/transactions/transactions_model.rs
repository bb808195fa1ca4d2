//! Transaction domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Transaction as returned by the aggregator.
///
/// Sign convention: a positive amount is an outflow (expense), a negative
/// amount is an inflow (income).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub external_id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub authorized_date: Option<NaiveDate>,
    pub authorized_datetime: Option<DateTime<Utc>>,
    /// Display name. Mappings are keyed by this value.
    pub name: String,
    pub merchant_name: Option<String>,
    pub payment_channel: Option<String>,
    /// Vendor category (primary personal-finance category).
    pub category: Option<String>,
    /// Vendor group (detailed personal-finance category).
    pub group: Option<String>,
    pub pending: bool,
    pub iso_currency_code: Option<String>,
}

/// Stored transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// External transaction id from the aggregator.
    pub id: String,
    pub account_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub authorized_date: Option<NaiveDate>,
    pub authorized_datetime: Option<DateTime<Utc>>,
    pub name: String,
    pub merchant_name: Option<String>,
    pub payment_channel: Option<String>,
    pub category: Option<String>,
    pub group: Option<String>,
    pub pending: bool,
    pub iso_currency_code: Option<String>,
    /// When the sync that last wrote this row pulled it.
    pub pulled_at: DateTime<Utc>,
    /// Sync job that last wrote this row.
    pub sync_job_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Accumulated result of one or more sync pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionChanges {
    pub added: Vec<TransactionSnapshot>,
    pub modified: Vec<TransactionSnapshot>,
    /// External ids to hard-delete.
    pub removed: Vec<String>,
}

impl TransactionChanges {
    pub fn new(
        added: Vec<TransactionSnapshot>,
        modified: Vec<TransactionSnapshot>,
        removed: Vec<String>,
    ) -> Self {
        Self {
            added,
            modified,
            removed,
        }
    }

    /// Appends a later page of the same sync run.
    pub fn merge_page(&mut self, page: TransactionChanges) {
        self.added.extend(page.added);
        self.modified.extend(page.modified);
        self.removed.extend(page.removed);
    }

    /// Folds a newer set of changes over this one.
    ///
    /// Rows from `newer` replace rows with the same id. Ids removed by either
    /// side are dropped from the upsert lists and kept in `removed`.
    pub fn merge_newer(self, newer: TransactionChanges) -> TransactionChanges {
        let removed: Vec<String> = {
            let mut seen = HashSet::new();
            self.removed
                .into_iter()
                .chain(newer.removed)
                .filter(|id| seen.insert(id.clone()))
                .collect()
        };
        let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();

        let mut added = self.added;
        let mut modified = self.modified;
        let mut index: HashMap<String, (bool, usize)> = HashMap::new();
        for (i, t) in added.iter().enumerate() {
            index.insert(t.external_id.clone(), (true, i));
        }
        for (i, t) in modified.iter().enumerate() {
            index.insert(t.external_id.clone(), (false, i));
        }

        for (is_added, txn) in newer
            .added
            .into_iter()
            .map(|t| (true, t))
            .chain(newer.modified.into_iter().map(|t| (false, t)))
        {
            match index.get(&txn.external_id) {
                Some(&(true, i)) => added[i] = txn,
                Some(&(false, i)) => modified[i] = txn,
                None if is_added => {
                    index.insert(txn.external_id.clone(), (true, added.len()));
                    added.push(txn);
                }
                None => {
                    index.insert(txn.external_id.clone(), (false, modified.len()));
                    modified.push(txn);
                }
            }
        }

        added.retain(|t| !removed_set.contains(t.external_id.as_str()));
        modified.retain(|t| !removed_set.contains(t.external_id.as_str()));

        TransactionChanges {
            added,
            modified,
            removed,
        }
    }

    /// All rows to upsert, added first.
    pub fn upserts(&self) -> impl Iterator<Item = &TransactionSnapshot> {
        self.added.iter().chain(self.modified.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn txn(id: &str, amount: Decimal) -> TransactionSnapshot {
        TransactionSnapshot {
            external_id: id.to_string(),
            account_id: "acc-1".to_string(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            authorized_date: None,
            authorized_datetime: None,
            name: "Coffee".to_string(),
            merchant_name: None,
            payment_channel: Some("in store".to_string()),
            category: None,
            group: None,
            pending: false,
            iso_currency_code: Some("USD".to_string()),
        }
    }

    #[test]
    fn merge_page_accumulates_all_lists() {
        let mut changes = TransactionChanges::new(vec![txn("t1", dec!(1))], vec![], vec![]);
        changes.merge_page(TransactionChanges::new(
            vec![txn("t2", dec!(2))],
            vec![txn("t1", dec!(3))],
            vec!["t0".to_string()],
        ));

        assert_eq!(changes.added.len(), 2);
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.removed, vec!["t0".to_string()]);
    }

    #[test]
    fn merge_newer_replaces_by_id_and_applies_removals() {
        let history = TransactionChanges::new(
            vec![txn("t1", dec!(10)), txn("t2", dec!(20)), txn("t3", dec!(30))],
            vec![],
            vec![],
        );
        let sync = TransactionChanges::new(
            vec![txn("t4", dec!(40))],
            vec![txn("t2", dec!(21))],
            vec!["t3".to_string()],
        );

        let merged = history.merge_newer(sync);

        let ids: Vec<&str> = merged.added.iter().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t4"]);
        assert_eq!(merged.added[1].amount, dec!(21));
        assert!(merged.modified.is_empty());
        assert_eq!(merged.removed, vec!["t3".to_string()]);
    }

    #[test]
    fn upserts_yields_added_then_modified() {
        let changes = TransactionChanges::new(
            vec![txn("a", dec!(1))],
            vec![txn("m", dec!(2))],
            vec![],
        );
        let ids: Vec<&str> = changes.upserts().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m"]);
        assert!(!changes.is_empty());
        assert!(TransactionChanges::default().is_empty());
    }
}
