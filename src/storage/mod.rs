mod repository;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    Account, AccountBalance, AccountId, NewAccount, NewTransaction, Transaction, TransactionId,
};

pub use repository::*;

/// SQL migration for the accounts/transactions schema and the balance view
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Backend holding the `accounts` and `transactions` tables and the derived
/// `account_balances` view.
///
/// Controllers only talk to this trait. Implementations own storage, ordering
/// and balance aggregation; callers never compute balances themselves.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Select all rows of `accounts`, oldest first.
    async fn select_accounts(&self) -> Result<Vec<Account>>;

    /// Insert one row into `accounts`.
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;

    /// Select all rows of `account_balances`.
    async fn select_account_balances(&self) -> Result<Vec<AccountBalance>>;

    /// Select the transactions of one account, newest `transaction_date` first.
    async fn select_transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>>;

    /// Insert a batch of transactions. Either every row is stored or none is.
    async fn insert_transactions(&self, rows: Vec<NewTransaction>) -> Result<Vec<Transaction>>;

    /// Delete a transaction by id. Deleting an unknown id is not an error.
    async fn delete_transaction(&self, id: TransactionId) -> Result<()>;
}
