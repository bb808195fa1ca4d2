//! Account domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{errors::ValidationError, Error, Result};

/// Account classification as reported by the aggregator.
///
/// Only the four known types carry a balance extension. Anything else is
/// stored with its base row only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    Depository,
    Credit,
    Loan,
    Investment,
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Depository => "depository",
            AccountType::Credit => "credit",
            AccountType::Loan => "loan",
            AccountType::Investment => "investment",
            AccountType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for AccountType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "depository" => AccountType::Depository,
            "credit" => AccountType::Credit,
            "loan" => AccountType::Loan,
            "investment" | "brokerage" => AccountType::Investment,
            _ => AccountType::Other(s.to_ascii_lowercase()),
        }
    }
}

impl From<&str> for AccountType {
    fn from(s: &str) -> Self {
        AccountType::from(s.to_string())
    }
}

impl From<AccountType> for String {
    fn from(t: AccountType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time balances for an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub current: Option<Decimal>,
    pub available: Option<Decimal>,
    pub limit: Option<Decimal>,
    pub iso_currency_code: Option<String>,
}

/// Account as returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub external_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    pub account_type: AccountType,
    pub subtype: Option<String>,
    pub balances: Balances,
}

impl AccountSnapshot {
    pub fn currency(&self) -> String {
        self.balances
            .iso_currency_code
            .clone()
            .unwrap_or_else(|| "USD".to_string())
    }
}

/// One APR entry on a credit card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apr {
    pub apr_percentage: Option<Decimal>,
    pub apr_type: Option<String>,
    pub balance_subject_to_apr: Option<Decimal>,
    pub interest_charge_amount: Option<Decimal>,
}

/// Credit card liability details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLiability {
    pub account_id: String,
    pub last_statement_balance: Option<Decimal>,
    pub last_statement_issue_date: Option<NaiveDate>,
    pub minimum_payment_amount: Option<Decimal>,
    pub next_payment_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub aprs: Vec<Apr>,
}

/// Student loan or mortgage liability details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanLiability {
    pub account_id: String,
    pub origination_principal_amount: Option<Decimal>,
    pub interest_rate_percentage: Option<Decimal>,
}

/// Liabilities for every account of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liabilities {
    #[serde(default)]
    pub credit: Vec<CreditLiability>,
    #[serde(default)]
    pub loans: Vec<LoanLiability>,
}

impl Liabilities {
    pub fn credit_for(&self, account_id: &str) -> Option<&CreditLiability> {
        self.credit.iter().find(|c| c.account_id == account_id)
    }

    pub fn loan_for(&self, account_id: &str) -> Option<&LoanLiability> {
        self.loans.iter().find(|l| l.account_id == account_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositoryBalance {
    pub current: Option<Decimal>,
    pub available: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    pub current: Option<Decimal>,
    pub available: Option<Decimal>,
    pub limit: Option<Decimal>,
    pub last_statement_balance: Option<Decimal>,
    pub last_statement_date: Option<NaiveDate>,
    pub minimum_payment: Option<Decimal>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub apr_percentage: Option<Decimal>,
    pub apr_type: Option<String>,
    pub balance_subject_to_apr: Option<Decimal>,
    pub interest_charge: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBalance {
    pub current: Option<Decimal>,
    pub original_loan_amount: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentBalance {
    pub current: Option<Decimal>,
}

/// Type-specific balance fields. Each variant is stored in its own table
/// and holds only the fields that make sense for that account type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BalanceExtension {
    Depository(DepositoryBalance),
    Credit(CreditBalance),
    Loan(LoanBalance),
    Investment(InvestmentBalance),
}

impl BalanceExtension {
    /// Builds the extension matching the snapshot's type, merging liability
    /// details where the aggregator supplied them.
    pub fn for_account(snapshot: &AccountSnapshot, liabilities: &Liabilities) -> Option<Self> {
        let b = &snapshot.balances;
        match snapshot.account_type {
            AccountType::Depository => Some(BalanceExtension::Depository(DepositoryBalance {
                current: b.current,
                available: b.available,
            })),
            AccountType::Credit => {
                let mut credit = CreditBalance {
                    current: b.current,
                    available: b.available,
                    limit: b.limit,
                    ..Default::default()
                };
                if let Some(card) = liabilities.credit_for(&snapshot.external_id) {
                    credit.last_statement_balance = card.last_statement_balance;
                    credit.last_statement_date = card.last_statement_issue_date;
                    credit.minimum_payment = card.minimum_payment_amount;
                    credit.next_payment_due_date = card.next_payment_due_date;
                    if let Some(apr) = card.aprs.first() {
                        credit.apr_percentage = apr.apr_percentage;
                        credit.apr_type = apr.apr_type.clone();
                        credit.balance_subject_to_apr = apr.balance_subject_to_apr;
                        credit.interest_charge = apr.interest_charge_amount;
                    }
                }
                Some(BalanceExtension::Credit(credit))
            }
            AccountType::Loan => {
                let loan = liabilities.loan_for(&snapshot.external_id);
                Some(BalanceExtension::Loan(LoanBalance {
                    current: b.current,
                    original_loan_amount: loan.and_then(|l| l.origination_principal_amount),
                    interest_rate: loan.and_then(|l| l.interest_rate_percentage),
                }))
            }
            AccountType::Investment => Some(BalanceExtension::Investment(InvestmentBalance {
                current: b.current,
            })),
            AccountType::Other(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BalanceExtension::Depository(_) => "depository",
            BalanceExtension::Credit(_) => "credit",
            BalanceExtension::Loan(_) => "loan",
            BalanceExtension::Investment(_) => "investment",
        }
    }

    /// Rejects an extension that does not belong to the given account type.
    pub fn validate_for(&self, account_type: &AccountType) -> Result<()> {
        let ok = matches!(
            (self, account_type),
            (BalanceExtension::Depository(_), AccountType::Depository)
                | (BalanceExtension::Credit(_), AccountType::Credit)
                | (BalanceExtension::Loan(_), AccountType::Loan)
                | (BalanceExtension::Investment(_), AccountType::Investment)
        );
        if ok {
            Ok(())
        } else {
            Err(Error::Validation(ValidationError::ExtensionMismatch {
                account_type: account_type.to_string(),
                extension: self.kind().to_string(),
            }))
        }
    }
}

/// Stored account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// External account id from the aggregator.
    pub id: String,
    pub institution_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    pub account_type: AccountType,
    pub subtype: Option<String>,
    pub currency: String,
    pub balance: Option<BalanceExtension>,
    pub pulled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Number of accounts written per type during one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpsertCounts {
    pub depository: u32,
    pub credit: u32,
    pub loan: u32,
    pub investment: u32,
    pub other: u32,
}

impl AccountUpsertCounts {
    pub fn record(&mut self, account_type: &AccountType) {
        match account_type {
            AccountType::Depository => self.depository += 1,
            AccountType::Credit => self.credit += 1,
            AccountType::Loan => self.loan += 1,
            AccountType::Investment => self.investment += 1,
            AccountType::Other(_) => self.other += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.depository + self.credit + self.loan + self.investment + self.other
    }
}
