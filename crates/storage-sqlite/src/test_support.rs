//! Fixtures shared by the storage tests.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

use ledgerlink_core::accounts::{AccountSnapshot, AccountType, Balances, Liabilities};
use ledgerlink_core::institutions::{ExchangedToken, InstitutionHealth, InstitutionSnapshot};
use ledgerlink_core::sync::{SyncBatch, SyncMode};
use ledgerlink_core::transactions::{TransactionChanges, TransactionSnapshot};

use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};

pub(crate) struct TestDb {
    // Keeps the database file alive for the test.
    _dir: TempDir,
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
}

pub(crate) fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_path = init(db_path.to_str().unwrap()).unwrap();
    let pool = create_pool(&db_path).unwrap();
    run_migrations(&pool).unwrap();
    let writer = spawn_writer((*pool).clone());
    TestDb {
        _dir: dir,
        pool,
        writer,
    }
}

pub(crate) fn institution(id: &str) -> InstitutionSnapshot {
    InstitutionSnapshot {
        id: id.to_string(),
        name: format!("Bank {}", id),
        oauth: false,
        products: vec!["transactions".to_string()],
        health: InstitutionHealth::Healthy,
        item_id: format!("item-{}", id),
    }
}

pub(crate) fn account(id: &str, name: &str, account_type: AccountType) -> AccountSnapshot {
    AccountSnapshot {
        external_id: id.to_string(),
        name: name.to_string(),
        official_name: None,
        mask: Some("0000".to_string()),
        account_type,
        subtype: None,
        balances: Balances {
            current: Some(Decimal::new(10000, 2)),
            available: Some(Decimal::new(9000, 2)),
            limit: None,
            iso_currency_code: Some("USD".to_string()),
        },
    }
}

pub(crate) fn txn(id: &str, account_id: &str, name: &str, amount: Decimal) -> TransactionSnapshot {
    TransactionSnapshot {
        external_id: id.to_string(),
        account_id: account_id.to_string(),
        amount,
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        authorized_date: None,
        authorized_datetime: None,
        name: name.to_string(),
        merchant_name: None,
        payment_channel: Some("online".to_string()),
        category: None,
        group: None,
        pending: false,
        iso_currency_code: Some("USD".to_string()),
    }
}

pub(crate) fn batch(
    institution_id: &str,
    accounts: Vec<AccountSnapshot>,
    changes: TransactionChanges,
    next_cursor: Option<&str>,
) -> SyncBatch {
    SyncBatch {
        job_id: format!("job-{}", institution_id),
        pulled_at: Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap(),
        mode: SyncMode::Full,
        institution: institution(institution_id),
        credential: Some(ExchangedToken {
            access_token: format!("access-{}", institution_id),
            item_id: format!("item-{}", institution_id),
        }),
        accounts,
        liabilities: Liabilities::default(),
        changes,
        next_cursor: next_cursor.map(str::to_string),
    }
}
