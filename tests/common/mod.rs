// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use bookkeeper::application::AccountDirectory;
use bookkeeper::domain::{
    Account, AccountBalance, AccountId, NewAccount, NewTransaction, Transaction, TransactionId,
};
use bookkeeper::storage::{database_url, DataService, Repository};
use chrono::NaiveDate;
use tempfile::TempDir;

/// Data service wrapper that delegates to a real repository and fails on demand.
pub struct FlakyService {
    inner: Repository,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hidden: Mutex<Vec<AccountId>>,
    writes: AtomicUsize,
}

impl FlakyService {
    pub fn new(inner: Repository) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            hidden: Mutex::new(Vec::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make an account disappear from the balance view, as if it had been
    /// removed by another client.
    pub fn hide_account(&self, id: AccountId) {
        self.hidden.lock().unwrap().push(id);
    }

    /// Number of write calls that reached the service (failed or not).
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("injected read failure");
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("injected write failure");
        }
        Ok(())
    }
}

#[async_trait]
impl DataService for FlakyService {
    async fn select_accounts(&self) -> Result<Vec<Account>> {
        self.check_read()?;
        self.inner.select_accounts().await
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        self.check_write()?;
        self.inner.insert_account(account).await
    }

    async fn select_account_balances(&self) -> Result<Vec<AccountBalance>> {
        self.check_read()?;
        let hidden = self.hidden.lock().unwrap().clone();
        let balances = self.inner.select_account_balances().await?;
        Ok(balances
            .into_iter()
            .filter(|b| !hidden.contains(&b.id))
            .collect())
    }

    async fn select_transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>> {
        self.check_read()?;
        self.inner.select_transactions(account_id).await
    }

    async fn insert_transactions(&self, rows: Vec<NewTransaction>) -> Result<Vec<Transaction>> {
        self.check_write()?;
        self.inner.insert_transactions(rows).await
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        self.check_write()?;
        self.inner.delete_transaction(id).await
    }
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(Arc<FlakyService>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&database_url(db_path.to_str().unwrap(), true)).await?;
    Ok((Arc::new(FlakyService::new(repo)), temp_dir))
}

/// Helper to create a mounted directory over a fresh database with the given
/// accounts (name, number), created in order.
pub async fn test_directory(
    accounts: &[(&str, &str)],
) -> Result<(AccountDirectory, Arc<FlakyService>, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    for (name, number) in accounts {
        service.insert_account(NewAccount::new(*name, *number)).await?;
    }

    let mut directory = AccountDirectory::new(service.clone());
    assert!(directory.mount().await.is_done());
    Ok((directory, service, temp_dir))
}

/// Helper to parse a date string
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Look up an account id by name in the directory snapshot.
pub fn account_id(directory: &AccountDirectory, name: &str) -> AccountId {
    directory.find_account(name).unwrap().id
}

pub fn balance_of(directory: &AccountDirectory, name: &str) -> i64 {
    directory.find_account(name).unwrap().balance
}
