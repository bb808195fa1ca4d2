//! Tests for account domain models and balance extensions.

use crate::accounts::*;
use crate::errors::{Error, ValidationError};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn snapshot(id: &str, account_type: AccountType) -> AccountSnapshot {
    AccountSnapshot {
        external_id: id.to_string(),
        name: format!("Account {}", id),
        official_name: None,
        mask: Some("0000".to_string()),
        account_type,
        subtype: None,
        balances: Balances {
            current: Some(dec!(120.50)),
            available: Some(dec!(100)),
            limit: Some(dec!(5000)),
            iso_currency_code: Some("USD".to_string()),
        },
    }
}

// ==================== AccountType ====================

#[test]
fn test_account_type_parsing_is_case_insensitive() {
    assert_eq!(AccountType::from("Depository"), AccountType::Depository);
    assert_eq!(AccountType::from("CREDIT"), AccountType::Credit);
    assert_eq!(AccountType::from("brokerage"), AccountType::Investment);
    assert_eq!(
        AccountType::from("Other"),
        AccountType::Other("other".to_string())
    );
}

#[test]
fn test_account_type_serializes_as_plain_string() {
    assert_eq!(
        serde_json::to_string(&AccountType::Loan).unwrap(),
        "\"loan\""
    );
    let parsed: AccountType = serde_json::from_str("\"investment\"").unwrap();
    assert_eq!(parsed, AccountType::Investment);
}

// ==================== BalanceExtension ====================

#[test]
fn test_depository_extension_only_has_current_and_available() {
    let ext = BalanceExtension::for_account(
        &snapshot("a1", AccountType::Depository),
        &Liabilities::default(),
    );
    assert_eq!(
        ext,
        Some(BalanceExtension::Depository(DepositoryBalance {
            current: Some(dec!(120.50)),
            available: Some(dec!(100)),
        }))
    );
}

#[test]
fn test_credit_extension_merges_liabilities() {
    let liabilities = Liabilities {
        credit: vec![CreditLiability {
            account_id: "c1".to_string(),
            last_statement_balance: Some(dec!(410.12)),
            last_statement_issue_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            minimum_payment_amount: Some(dec!(25)),
            next_payment_due_date: NaiveDate::from_ymd_opt(2024, 3, 28),
            aprs: vec![
                Apr {
                    apr_percentage: Some(dec!(24.99)),
                    apr_type: Some("purchase_apr".to_string()),
                    balance_subject_to_apr: Some(dec!(300)),
                    interest_charge_amount: Some(dec!(6.2)),
                },
                Apr {
                    apr_percentage: Some(dec!(29.99)),
                    apr_type: Some("cash_apr".to_string()),
                    ..Default::default()
                },
            ],
        }],
        loans: vec![],
    };

    let ext = BalanceExtension::for_account(&snapshot("c1", AccountType::Credit), &liabilities);
    let Some(BalanceExtension::Credit(credit)) = ext else {
        panic!("expected credit extension");
    };
    assert_eq!(credit.limit, Some(dec!(5000)));
    assert_eq!(credit.last_statement_balance, Some(dec!(410.12)));
    assert_eq!(credit.minimum_payment, Some(dec!(25)));
    assert_eq!(credit.apr_percentage, Some(dec!(24.99)));
    assert_eq!(credit.apr_type.as_deref(), Some("purchase_apr"));
    assert_eq!(credit.interest_charge, Some(dec!(6.2)));
}

#[test]
fn test_credit_extension_without_liabilities_keeps_balances() {
    let ext = BalanceExtension::for_account(
        &snapshot("c2", AccountType::Credit),
        &Liabilities::default(),
    );
    let Some(BalanceExtension::Credit(credit)) = ext else {
        panic!("expected credit extension");
    };
    assert_eq!(credit.current, Some(dec!(120.50)));
    assert!(credit.last_statement_balance.is_none());
    assert!(credit.apr_percentage.is_none());
}

#[test]
fn test_loan_extension_uses_loan_liability() {
    let liabilities = Liabilities {
        credit: vec![],
        loans: vec![LoanLiability {
            account_id: "l1".to_string(),
            origination_principal_amount: Some(dec!(25000)),
            interest_rate_percentage: Some(dec!(4.5)),
        }],
    };
    let ext = BalanceExtension::for_account(&snapshot("l1", AccountType::Loan), &liabilities);
    assert_eq!(
        ext,
        Some(BalanceExtension::Loan(LoanBalance {
            current: Some(dec!(120.50)),
            original_loan_amount: Some(dec!(25000)),
            interest_rate: Some(dec!(4.5)),
        }))
    );
}

#[test]
fn test_other_type_has_no_extension() {
    let ext = BalanceExtension::for_account(
        &snapshot("o1", AccountType::Other("payroll".to_string())),
        &Liabilities::default(),
    );
    assert!(ext.is_none());
}

#[test]
fn test_validate_rejects_mismatched_extension() {
    let ext = BalanceExtension::Credit(CreditBalance::default());
    let err = ext.validate_for(&AccountType::Depository).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::ExtensionMismatch { .. })
    ));
    assert!(ext.validate_for(&AccountType::Credit).is_ok());
}

// ==================== AccountUpsertCounts ====================

#[test]
fn test_upsert_counts_per_type() {
    let mut counts = AccountUpsertCounts::default();
    counts.record(&AccountType::Depository);
    counts.record(&AccountType::Depository);
    counts.record(&AccountType::Credit);
    counts.record(&AccountType::Other("x".to_string()));

    assert_eq!(counts.depository, 2);
    assert_eq!(counts.credit, 1);
    assert_eq!(counts.other, 1);
    assert_eq!(counts.total(), 4);
}
