//! SQLite storage implementation for accounts and balance extensions.

mod model;
mod repository;

pub use model::{AccountDB, CreditBalanceDB, DepositoryBalanceDB, InvestmentBalanceDB, LoanBalanceDB};
pub use repository::AccountRepository;

pub(crate) use repository::{delete_accounts_except, upsert_account, write_balance_extension};
