//! Database models for accounts and their type-specific balance extensions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledgerlink_core::accounts::{
    Account, AccountSnapshot, AccountType, BalanceExtension, CreditBalance, DepositoryBalance,
    InvestmentBalance, LoanBalance,
};

use crate::utils::{
    opt_date_to_text, opt_decimal_to_text, parse_opt_date, parse_opt_decimal, parse_timestamp,
    timestamp_to_text,
};

/// Database model for accounts
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub id: String,
    pub institution_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    pub account_type: String,
    pub subtype: Option<String>,
    pub currency: String,
    pub pulled_at: String,
    pub sync_job_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AccountDB {
    pub fn from_snapshot(
        snapshot: &AccountSnapshot,
        institution_id: &str,
        pulled_at: &DateTime<Utc>,
        sync_job_id: &str,
    ) -> Self {
        let now = timestamp_to_text(&Utc::now());
        Self {
            id: snapshot.external_id.clone(),
            institution_id: institution_id.to_string(),
            name: snapshot.name.clone(),
            official_name: snapshot.official_name.clone(),
            mask: snapshot.mask.clone(),
            account_type: snapshot.account_type.to_string(),
            subtype: snapshot.subtype.clone(),
            currency: snapshot.currency(),
            pulled_at: timestamp_to_text(pulled_at),
            sync_job_id: Some(sync_job_id.to_string()),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn account_type(&self) -> AccountType {
        AccountType::from(self.account_type.as_str())
    }

    pub fn into_domain(self, balance: Option<BalanceExtension>) -> Account {
        Account {
            account_type: self.account_type(),
            id: self.id,
            institution_id: self.institution_id,
            name: self.name,
            official_name: self.official_name,
            mask: self.mask,
            subtype: self.subtype,
            currency: self.currency,
            balance,
            pulled_at: parse_timestamp(&self.pulled_at, "pulled_at"),
            created_at: parse_timestamp(&self.created_at, "created_at"),
            updated_at: parse_timestamp(&self.updated_at, "updated_at"),
        }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::depository_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(account_id))]
#[diesel(treat_none_as_null = true)]
pub struct DepositoryBalanceDB {
    pub account_id: String,
    pub balance_current: Option<String>,
    pub balance_available: Option<String>,
    pub pulled_at: String,
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::credit_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(account_id))]
#[diesel(treat_none_as_null = true)]
pub struct CreditBalanceDB {
    pub account_id: String,
    pub balance_current: Option<String>,
    pub balance_available: Option<String>,
    pub balance_limit: Option<String>,
    pub last_statement_balance: Option<String>,
    pub last_statement_date: Option<String>,
    pub minimum_payment_amount: Option<String>,
    pub next_payment_due_date: Option<String>,
    pub apr_percentage: Option<String>,
    pub apr_type: Option<String>,
    pub balance_subject_to_apr: Option<String>,
    pub interest_charge_amount: Option<String>,
    pub pulled_at: String,
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::loan_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(account_id))]
#[diesel(treat_none_as_null = true)]
pub struct LoanBalanceDB {
    pub account_id: String,
    pub balance_current: Option<String>,
    pub original_loan_amount: Option<String>,
    pub interest_rate: Option<String>,
    pub pulled_at: String,
}

#[derive(Queryable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::investment_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(account_id))]
#[diesel(treat_none_as_null = true)]
pub struct InvestmentBalanceDB {
    pub account_id: String,
    pub balance_current: Option<String>,
    pub pulled_at: String,
}

impl DepositoryBalanceDB {
    pub fn new(account_id: &str, b: &DepositoryBalance, pulled_at: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            balance_current: opt_decimal_to_text(b.current),
            balance_available: opt_decimal_to_text(b.available),
            pulled_at: pulled_at.to_string(),
        }
    }
}

impl CreditBalanceDB {
    pub fn new(account_id: &str, b: &CreditBalance, pulled_at: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            balance_current: opt_decimal_to_text(b.current),
            balance_available: opt_decimal_to_text(b.available),
            balance_limit: opt_decimal_to_text(b.limit),
            last_statement_balance: opt_decimal_to_text(b.last_statement_balance),
            last_statement_date: opt_date_to_text(b.last_statement_date),
            minimum_payment_amount: opt_decimal_to_text(b.minimum_payment),
            next_payment_due_date: opt_date_to_text(b.next_payment_due_date),
            apr_percentage: opt_decimal_to_text(b.apr_percentage),
            apr_type: b.apr_type.clone(),
            balance_subject_to_apr: opt_decimal_to_text(b.balance_subject_to_apr),
            interest_charge_amount: opt_decimal_to_text(b.interest_charge),
            pulled_at: pulled_at.to_string(),
        }
    }
}

impl LoanBalanceDB {
    pub fn new(account_id: &str, b: &LoanBalance, pulled_at: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            balance_current: opt_decimal_to_text(b.current),
            original_loan_amount: opt_decimal_to_text(b.original_loan_amount),
            interest_rate: opt_decimal_to_text(b.interest_rate),
            pulled_at: pulled_at.to_string(),
        }
    }
}

impl InvestmentBalanceDB {
    pub fn new(account_id: &str, b: &InvestmentBalance, pulled_at: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            balance_current: opt_decimal_to_text(b.current),
            pulled_at: pulled_at.to_string(),
        }
    }
}

impl From<DepositoryBalanceDB> for BalanceExtension {
    fn from(db: DepositoryBalanceDB) -> Self {
        BalanceExtension::Depository(DepositoryBalance {
            current: parse_opt_decimal(db.balance_current.as_deref(), "balance_current"),
            available: parse_opt_decimal(db.balance_available.as_deref(), "balance_available"),
        })
    }
}

impl From<CreditBalanceDB> for BalanceExtension {
    fn from(db: CreditBalanceDB) -> Self {
        BalanceExtension::Credit(CreditBalance {
            current: parse_opt_decimal(db.balance_current.as_deref(), "balance_current"),
            available: parse_opt_decimal(db.balance_available.as_deref(), "balance_available"),
            limit: parse_opt_decimal(db.balance_limit.as_deref(), "balance_limit"),
            last_statement_balance: parse_opt_decimal(
                db.last_statement_balance.as_deref(),
                "last_statement_balance",
            ),
            last_statement_date: parse_opt_date(
                db.last_statement_date.as_deref(),
                "last_statement_date",
            ),
            minimum_payment: parse_opt_decimal(
                db.minimum_payment_amount.as_deref(),
                "minimum_payment_amount",
            ),
            next_payment_due_date: parse_opt_date(
                db.next_payment_due_date.as_deref(),
                "next_payment_due_date",
            ),
            apr_percentage: parse_opt_decimal(db.apr_percentage.as_deref(), "apr_percentage"),
            apr_type: db.apr_type,
            balance_subject_to_apr: parse_opt_decimal(
                db.balance_subject_to_apr.as_deref(),
                "balance_subject_to_apr",
            ),
            interest_charge: parse_opt_decimal(
                db.interest_charge_amount.as_deref(),
                "interest_charge_amount",
            ),
        })
    }
}

impl From<LoanBalanceDB> for BalanceExtension {
    fn from(db: LoanBalanceDB) -> Self {
        BalanceExtension::Loan(LoanBalance {
            current: parse_opt_decimal(db.balance_current.as_deref(), "balance_current"),
            original_loan_amount: parse_opt_decimal(
                db.original_loan_amount.as_deref(),
                "original_loan_amount",
            ),
            interest_rate: parse_opt_decimal(db.interest_rate.as_deref(), "interest_rate"),
        })
    }
}

impl From<InvestmentBalanceDB> for BalanceExtension {
    fn from(db: InvestmentBalanceDB) -> Self {
        BalanceExtension::Investment(InvestmentBalance {
            current: parse_opt_decimal(db.balance_current.as_deref(), "balance_current"),
        })
    }
}
