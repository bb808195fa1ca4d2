mod common;

use rust_decimal_macros::dec;

use common::{account, harness, institution, script_new_institution, txn, txns, Call};
use ledgerlink_core::accounts::{AccountRepositoryTrait, AccountType};
use ledgerlink_core::errors::{AggregatorError, Error, ValidationError};
use ledgerlink_core::institutions::{InstitutionHealth, InstitutionRepositoryTrait, LinkMetadata};
use ledgerlink_core::sync::{
    ApiCallLogRepositoryTrait, CursorRepositoryTrait, CursorStatus, LinkStage,
    SyncJobRepositoryTrait, SyncJobStatus, SyncMode, SyncStoreTrait, SyncTrigger,
};
use ledgerlink_core::transactions::{TransactionChanges, TransactionRepositoryTrait};

fn metadata(id: &str) -> LinkMetadata {
    LinkMetadata {
        institution_id: Some(id.to_string()),
        institution_name: Some(format!("Bank {}", id)),
        link_session_id: None,
    }
}

fn saved_cursor(h: &common::Harness, id: &str) -> Option<String> {
    h.cursors.get(id).unwrap().and_then(|c| c.cursor)
}

#[tokio::test]
async fn link_then_webhook_sync_ends_with_52_transactions_and_cursor_c2() {
    let h = harness();
    let access = script_new_institution(&h, "X", "pub-x", 50, "c1");

    let linked = h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    assert_eq!(linked.institution_id, "X");
    assert_eq!(linked.mode, SyncMode::Full);
    assert_eq!(linked.summary.accounts.total(), 3);
    assert_eq!(linked.summary.transactions_added, 50);
    assert_eq!(h.store.count_transactions("X").unwrap(), 50);
    assert_eq!(h.accounts.list_for_institution("X").unwrap().len(), 3);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c1"));

    let job = h.jobs.get(&linked.job_id).unwrap().unwrap();
    assert_eq!(job.status, SyncJobStatus::Done);
    assert_eq!(job.stage, LinkStage::Committed);
    assert_eq!(job.trigger, SyncTrigger::Link);

    // Two pages: the first one has more data behind it.
    h.aggregator.sync_page(
        &access,
        Some("c1"),
        TransactionChanges::new(vec![txn("new-1", "X-chk", dec!(4.50))], vec![], vec![]),
        "c1-p2",
        true,
    );
    h.aggregator.sync_page(
        &access,
        Some("c1-p2"),
        TransactionChanges::new(
            vec![txn("new-2", "X-sav", dec!(-1200))],
            vec![txn("X-0", "X-chk", dec!(1.25))],
            vec![],
        ),
        "c2",
        false,
    );
    h.aggregator.reset_calls();

    let synced = h
        .orchestrator
        .sync_item("item-pub-x", SyncTrigger::Webhook)
        .await
        .unwrap();

    assert_eq!(synced.mode, SyncMode::Incremental);
    assert_eq!(synced.summary.transactions_added, 2);
    assert_eq!(synced.summary.transactions_modified, 1);
    assert_eq!(h.store.count_transactions("X").unwrap(), 52);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c2"));
    assert_eq!(
        h.transactions.get("X-0").unwrap().unwrap().amount,
        dec!(1.25)
    );
    assert_eq!(h.aggregator.get_calls(), 0);
    assert_eq!(
        h.aggregator.sync_cursors(),
        vec![Some("c1".to_string()), Some("c1-p2".to_string())]
    );
}

#[tokio::test]
async fn new_institution_takes_full_path_and_known_one_resumes_from_cursor() {
    let h = harness();
    let access = script_new_institution(&h, "X", "pub-x", 45, "c1");

    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    // 45 transactions at 20 per page, then one cursorless sync for the cursor.
    assert_eq!(h.aggregator.get_calls(), 3);
    assert!(h.aggregator.calls().contains(&Call::Sync {
        cursor: None,
        days_requested: Some(730),
    }));

    h.aggregator
        .sync_page(&access, Some("c1"), TransactionChanges::default(), "c1", false);
    h.aggregator.reset_calls();

    let refreshed = h.orchestrator.refresh("X").await.unwrap();

    assert_eq!(refreshed.mode, SyncMode::Incremental);
    assert_eq!(h.aggregator.get_calls(), 0);
    assert_eq!(
        h.aggregator.calls().iter().find(|c| matches!(c, Call::Sync { .. })),
        Some(&Call::Sync {
            cursor: Some("c1".to_string()),
            days_requested: None,
        })
    );
}

#[tokio::test]
async fn cursor_without_transactions_is_reset_before_refresh() {
    let h = harness();
    let access = script_new_institution(&h, "X", "pub-x", 0, "c1");

    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();
    assert_eq!(h.store.count_transactions("X").unwrap(), 0);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c1"));

    h.aggregator.history(&access, txns("X", 4, &["X-chk"]));
    h.aggregator
        .sync_page(&access, None, TransactionChanges::default(), "c-fresh", false);
    h.aggregator.reset_calls();

    let refreshed = h.orchestrator.refresh("X").await.unwrap();

    assert_eq!(refreshed.mode, SyncMode::Full);
    assert!(h.aggregator.get_calls() > 0);
    assert!(!h.aggregator.sync_cursors().contains(&Some("c1".to_string())));
    assert_eq!(h.store.count_transactions("X").unwrap(), 4);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c-fresh"));
}

#[tokio::test]
async fn transient_history_failures_fall_back_to_cursorless_sync() {
    let h = harness();
    let access = script_new_institution(&h, "X", "pub-x", 10, "c1");
    h.aggregator
        .fail_history(AggregatorError::transient("PRODUCT_NOT_READY", "not ready"));
    h.aggregator.sync_page(
        &access,
        None,
        TransactionChanges::new(txns("X", 7, &["X-chk"]), vec![], vec![]),
        "c1",
        false,
    );

    let linked = h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    assert_eq!(h.aggregator.get_calls(), 3);
    assert_eq!(h.aggregator.sync_cursors(), vec![None]);
    assert_eq!(linked.summary.transactions_added, 7);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c1"));
}

#[tokio::test]
async fn permanent_error_on_refresh_keeps_data_and_marks_unhealthy() {
    let h = harness();
    script_new_institution(&h, "X", "pub-x", 12, "c1");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    h.aggregator.fail_sync(AggregatorError::permanent(
        "ITEM_LOGIN_REQUIRED",
        "the login details of this item have changed",
    ));

    let err = h.orchestrator.refresh("X").await.unwrap_err();

    assert!(matches!(err, Error::Aggregator(ref e) if e.is_permanent()));
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c1"));
    assert_eq!(h.store.count_transactions("X").unwrap(), 12);
    assert_eq!(
        h.institutions.get("X").unwrap().unwrap().health,
        InstitutionHealth::Unhealthy
    );

    let jobs = h.jobs.list_for_institution("X", 10).unwrap();
    let refresh = jobs
        .iter()
        .find(|j| j.trigger == SyncTrigger::Refresh)
        .unwrap();
    assert_eq!(refresh.status, SyncJobStatus::Failed);
    assert_eq!(refresh.stage, LinkStage::AccountsFetched);
    assert!(refresh.error.as_deref().unwrap().contains("ITEM_LOGIN_REQUIRED"));
}

#[tokio::test]
async fn failed_commit_leaves_cursor_and_rows_in_place() {
    let h = harness();
    let access = script_new_institution(&h, "X", "pub-x", 5, "c1");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    h.aggregator.sync_page(
        &access,
        Some("c1"),
        TransactionChanges::new(
            vec![txn("fine", "X-chk", dec!(3)), txn("orphan", "nope", dec!(9))],
            vec![],
            vec!["X-1".to_string()],
        ),
        "c2",
        false,
    );

    let err = h.orchestrator.refresh("X").await.unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::UnknownAccount { .. })
    ));
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("c1"));
    assert_eq!(h.store.count_transactions("X").unwrap(), 5);
    assert!(h.transactions.get("fine").unwrap().is_none());
    assert!(h.transactions.get("X-1").unwrap().is_some());
    // Not an aggregator problem, so health is unchanged.
    assert_eq!(
        h.institutions.get("X").unwrap().unwrap().health,
        InstitutionHealth::Healthy
    );
}

#[tokio::test]
async fn failure_after_exchange_writes_nothing_and_revokes_item() {
    let h = harness();
    script_new_institution(&h, "X", "pub-x", 5, "c1");
    h.aggregator
        .fail_accounts(AggregatorError::permanent("INVALID_REQUEST", "bad request"));

    let err = h.orchestrator.link("pub-x", &metadata("X")).await.unwrap_err();

    assert!(matches!(err, Error::Aggregator(_)));
    assert!(h.institutions.get("X").unwrap().is_none());
    assert!(h.institutions.get_credential("X").unwrap().is_none());
    assert!(h.cursors.get("X").unwrap().is_none());
    assert_eq!(h.aggregator.removed(), vec!["access-pub-x".to_string()]);

    let job = h.jobs.list_for_institution("X", 1).unwrap().remove(0);
    assert_eq!(job.status, SyncJobStatus::Failed);
    assert_eq!(job.stage, LinkStage::InstitutionSaved);
    assert_eq!(job.item_id.as_deref(), Some("item-pub-x"));
}

#[tokio::test]
async fn relink_under_new_item_replaces_old_item_and_its_data() {
    let h = harness();
    let old_access = script_new_institution(&h, "X", "pub-x", 6, "c1");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();
    assert_eq!(h.accounts.list_for_institution("X").unwrap().len(), 3);

    // The new item reports its own account and transaction ids.
    let access = "access-pub-x2";
    h.aggregator
        .item("pub-x2", access, institution("X", "item-pub-x2"));
    h.aggregator
        .accounts(access, vec![account("X2-chk", AccountType::Depository)]);
    h.aggregator.history(access, txns("X2", 6, &["X2-chk"]));
    h.aggregator
        .sync_page(access, None, TransactionChanges::default(), "r1", false);
    h.aggregator.reset_calls();

    let relinked = h.orchestrator.link("pub-x2", &metadata("X")).await.unwrap();

    assert_eq!(relinked.mode, SyncMode::Full);
    assert!(h.aggregator.get_calls() > 0);
    assert_eq!(h.aggregator.removed(), vec![old_access]);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("r1"));
    let credential = h.institutions.get_credential("X").unwrap().unwrap();
    assert_eq!(credential.item_id, "item-pub-x2");
    assert_eq!(credential.access_token, access);

    let accounts = h.accounts.list_for_institution("X").unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, "X2-chk");
    assert_eq!(h.store.count_transactions("X").unwrap(), 6);
    assert!(h.transactions.get("X-0").unwrap().is_none());
}

#[tokio::test]
async fn missing_liability_accounts_do_not_fail_link_or_refresh() {
    let h = harness();
    let access = "access-pub-l";
    let mut snapshot = institution("L", "item-pub-l");
    snapshot.products.push("liabilities".to_string());
    h.aggregator.item("pub-l", access, snapshot);
    h.aggregator
        .accounts(access, vec![account("L-chk", AccountType::Depository)]);
    h.aggregator.history(access, txns("L", 4, &["L-chk"]));
    h.aggregator
        .sync_page(access, None, TransactionChanges::default(), "l1", false);
    h.aggregator.fail_liabilities(AggregatorError::from_vendor(
        Some(400),
        Some("ITEM_ERROR"),
        Some("NO_LIABILITY_ACCOUNTS"),
        Some("no liability accounts"),
    ));

    let linked = h.orchestrator.link("pub-l", &metadata("L")).await.unwrap();

    assert_eq!(linked.summary.transactions_added, 4);
    assert!(h
        .aggregator
        .calls()
        .contains(&Call::Liabilities(access.to_string())));
    assert!(h.aggregator.removed().is_empty());
    assert_eq!(h.store.count_transactions("L").unwrap(), 4);

    h.aggregator
        .sync_page(access, Some("l1"), TransactionChanges::default(), "l2", false);
    h.orchestrator.refresh("L").await.unwrap();

    let stored = h.institutions.get("L").unwrap().unwrap();
    assert_eq!(stored.health, InstitutionHealth::Healthy);
    assert_eq!(saved_cursor(&h, "L").as_deref(), Some("l2"));
}

#[tokio::test]
async fn duplicate_webhook_delivery_is_idempotent() {
    let h = harness();
    let access = script_new_institution(&h, "X", "pub-x", 10, "c1");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    let changes = TransactionChanges::new(
        vec![txn("w-1", "X-chk", dec!(10)), txn("w-2", "X-card", dec!(20))],
        vec![txn("X-3", "X-chk", dec!(33))],
        vec!["X-4".to_string()],
    );
    h.aggregator
        .sync_page(&access, Some("c1"), changes.clone(), "c2", false);
    // The vendor replays the same changes when asked again from c2.
    h.aggregator.sync_page(&access, Some("c2"), changes, "c2", false);

    h.orchestrator
        .sync_item("item-pub-x", SyncTrigger::Webhook)
        .await
        .unwrap();
    let after_first = h.store.count_transactions("X").unwrap();
    let snapshot_first = h.transactions.list_for_institution("X").unwrap();

    h.orchestrator
        .sync_item("item-pub-x", SyncTrigger::Webhook)
        .await
        .unwrap();

    assert_eq!(after_first, 11);
    assert_eq!(h.store.count_transactions("X").unwrap(), after_first);
    let snapshot_second = h.transactions.list_for_institution("X").unwrap();
    let amounts = |rows: &[ledgerlink_core::transactions::Transaction]| {
        rows.iter()
            .map(|t| (t.id.clone(), t.amount, t.category.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(amounts(&snapshot_first), amounts(&snapshot_second));
    assert!(h.transactions.get("X-4").unwrap().is_none());
}

#[tokio::test]
async fn unlink_removes_only_that_institution() {
    let h = harness();
    script_new_institution(&h, "X", "pub-x", 9, "cx");
    script_new_institution(&h, "Y", "pub-y", 6, "cy");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();
    h.orchestrator.link("pub-y", &metadata("Y")).await.unwrap();

    let outcome = h.orchestrator.unlink("X").await.unwrap();

    assert!(outcome.revoked);
    assert_eq!(outcome.deleted.transactions, 9);
    assert_eq!(outcome.deleted.accounts, 3);
    assert_eq!(outcome.deleted.balance_extensions, 3);
    assert_eq!(outcome.deleted.cursors, 1);
    assert_eq!(outcome.deleted.credentials, 1);
    assert_eq!(outcome.deleted.institutions, 1);
    assert_eq!(h.aggregator.removed(), vec!["access-pub-x".to_string()]);

    assert_eq!(h.store.count_transactions("X").unwrap(), 0);
    assert!(h.accounts.list_for_institution("X").unwrap().is_empty());
    assert!(h.cursors.get("X").unwrap().is_none());
    assert!(h.institutions.get_credential("X").unwrap().is_none());

    assert_eq!(h.store.count_transactions("Y").unwrap(), 6);
    assert_eq!(h.accounts.list_for_institution("Y").unwrap().len(), 3);
    assert_eq!(
        h.cursors.get("Y").unwrap().unwrap().status,
        CursorStatus::Completed
    );

    assert!(matches!(
        h.orchestrator.unlink("X").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn item_error_webhook_marks_institution_unhealthy() {
    let h = harness();
    script_new_institution(&h, "X", "pub-x", 1, "c1");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    let id = h
        .orchestrator
        .mark_item_error("item-pub-x", "ITEM_LOGIN_REQUIRED")
        .await
        .unwrap();

    assert_eq!(id, "X");
    assert_eq!(
        h.institutions.get("X").unwrap().unwrap().health,
        InstitutionHealth::Unhealthy
    );
    assert!(matches!(
        h.orchestrator.sync_item("item-unknown", SyncTrigger::Webhook).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn syncs_of_different_institutions_run_side_by_side() {
    let h = harness();
    let ax = script_new_institution(&h, "X", "pub-x", 3, "cx");
    let ay = script_new_institution(&h, "Y", "pub-y", 4, "cy");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();
    h.orchestrator.link("pub-y", &metadata("Y")).await.unwrap();
    h.aggregator.sync_page(
        &ax,
        Some("cx"),
        TransactionChanges::new(vec![txn("x-new", "X-chk", dec!(1))], vec![], vec![]),
        "cx2",
        false,
    );
    h.aggregator.sync_page(
        &ay,
        Some("cy"),
        TransactionChanges::new(vec![txn("y-new", "Y-chk", dec!(2))], vec![], vec![]),
        "cy2",
        false,
    );

    let (x, y) = tokio::join!(h.orchestrator.refresh("X"), h.orchestrator.refresh("Y"));

    assert_eq!(x.unwrap().summary.transactions_added, 1);
    assert_eq!(y.unwrap().summary.transactions_added, 1);
    assert_eq!(saved_cursor(&h, "X").as_deref(), Some("cx2"));
    assert_eq!(saved_cursor(&h, "Y").as_deref(), Some("cy2"));
}

#[tokio::test]
async fn aggregator_calls_are_audited() {
    let h = harness();
    script_new_institution(&h, "X", "pub-x", 2, "c1");
    h.orchestrator.link("pub-x", &metadata("X")).await.unwrap();

    let calls = h.api_calls.recent(50).unwrap();
    let exchange = calls
        .iter()
        .find(|c| c.product == "item" && c.operation == "exchange")
        .unwrap();
    assert!(exchange.success);
    assert_eq!(exchange.item_id.as_deref(), Some("item-pub-x"));

    let accounts = calls
        .iter()
        .find(|c| c.product == "accounts")
        .unwrap();
    assert_eq!(accounts.items_retrieved, Some(3));
    assert!(calls.iter().any(|c| c.product == "transactions" && c.operation == "sync"));
}
