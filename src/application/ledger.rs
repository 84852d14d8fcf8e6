use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::domain::{
    today, AccountRef, Cents, NewTransaction, Transaction, TransactionId, TransactionType,
};
use crate::storage::DataService;

use super::{Outcome, RefreshSignal};

/// Interactive confirmation for irreversible actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Values of the single-entry form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryForm {
    pub amount: Option<Cents>,
    pub kind: TransactionType,
    pub description: String,
    pub transaction_date: NaiveDate,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self {
            amount: None,
            kind: TransactionType::Debit,
            description: String::new(),
            transaction_date: today(),
        }
    }
}

/// Transaction list and entry form for one account.
pub struct Ledger {
    service: Arc<dyn DataService>,
    signal: RefreshSignal,
    account: AccountRef,
    transactions: Vec<Transaction>,
    form: EntryForm,
}

impl Ledger {
    /// Create a ledger keyed to `account`. The list stays empty until
    /// [`Ledger::fetch_transactions`] runs.
    pub fn new(service: Arc<dyn DataService>, signal: RefreshSignal, account: AccountRef) -> Self {
        Self {
            service,
            signal,
            account,
            transactions: Vec::new(),
            form: EntryForm::default(),
        }
    }

    pub fn account(&self) -> &AccountRef {
        &self.account
    }

    /// Transactions, newest `transaction_date` first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn form(&self) -> &EntryForm {
        &self.form
    }

    pub fn heading(&self) -> String {
        format!("{} acc#: {}", self.account.name, self.account.account_number)
    }

    /// Re-key the ledger. A different account discards the current list and
    /// fetches the new one.
    pub async fn set_account(&mut self, account: AccountRef) -> Outcome {
        if account.id == self.account.id {
            self.account = account;
            return Outcome::Skipped;
        }

        self.account = account;
        self.transactions.clear();
        self.fetch_transactions().await
    }

    pub async fn fetch_transactions(&mut self) -> Outcome {
        let account_id = self.account.id;
        match self.service.select_transactions(account_id).await {
            Ok(transactions) => {
                debug!(%account_id, count = transactions.len(), "fetched transactions");
                self.transactions = transactions;
                Outcome::Done
            }
            Err(err) => {
                error!(%account_id, error = %err, "fetching transactions failed");
                Outcome::Failed
            }
        }
    }

    /// Record one transaction from the entry form.
    ///
    /// On success amount and description are cleared while date and type stay,
    /// so several entries for the same day can be typed in a row.
    pub async fn add_transaction(
        &mut self,
        amount: Option<Cents>,
        kind: TransactionType,
        description: impl Into<String>,
        transaction_date: NaiveDate,
    ) -> Outcome {
        self.form = EntryForm {
            amount,
            kind,
            description: description.into(),
            transaction_date,
        };

        let Some(amount) = self.form.amount else {
            return Outcome::Skipped;
        };

        let row = NewTransaction::new(self.account.id, amount, kind, transaction_date)
            .with_description(self.form.description.as_str());

        if let Err(err) = self.service.insert_transactions(vec![row]).await {
            error!(account_id = %self.account.id, error = %err, "adding transaction failed");
            return Outcome::Failed;
        }

        info!(account_id = %self.account.id, amount, %kind, "transaction added");
        self.form.amount = None;
        self.form.description.clear();

        let _ = self.fetch_transactions().await;
        self.signal.notify();
        Outcome::Done
    }

    /// Delete one transaction after the user confirmed it.
    pub async fn delete_transaction(&mut self, id: TransactionId, confirm: &dyn Confirm) -> Outcome {
        if !confirm.confirm("Are you sure you want to delete this transaction?") {
            return Outcome::Skipped;
        }

        if let Err(err) = self.service.delete_transaction(id).await {
            error!(transaction_id = %id, error = %err, "deleting transaction failed");
            return Outcome::Failed;
        }

        info!(transaction_id = %id, account_id = %self.account.id, "transaction deleted");
        let _ = self.fetch_transactions().await;
        self.signal.notify();
        Outcome::Done
    }
}
