use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::domain::{
    today, AccountBalance, AccountId, AccountRef, Cents, NewTransaction, TransactionType,
};
use crate::storage::DataService;

use super::{Outcome, RefreshSignal};

/// An uncommitted transaction row of the bulk entry grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub account_id: Option<AccountId>,
    pub transaction_date: NaiveDate,
    pub kind: TransactionType,
    pub amount: Option<Cents>,
    pub description: String,
}

impl Draft {
    pub fn new(account_id: Option<AccountId>) -> Self {
        Self {
            account_id,
            transaction_date: today(),
            kind: TransactionType::Debit,
            amount: None,
            description: String::new(),
        }
    }

    /// A draft is submitted only with both an account and an amount.
    pub fn is_complete(&self) -> bool {
        self.account_id.is_some() && self.amount.is_some()
    }

    fn to_new_transaction(&self) -> Option<NewTransaction> {
        let (account_id, amount) = (self.account_id?, self.amount?);
        Some(
            NewTransaction::new(account_id, amount, self.kind, self.transaction_date)
                .with_description(self.description.as_str()),
        )
    }
}

/// One editable field of a [`Draft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    Account(Option<AccountId>),
    Date(NaiveDate),
    Type(TransactionType),
    Amount(Option<Cents>),
    Description(String),
}

/// Grid of draft rows submitted together as one batch.
pub struct BulkEntry {
    service: Arc<dyn DataService>,
    signal: RefreshSignal,
    accounts: Vec<AccountRef>,
    drafts: Vec<Draft>,
}

impl BulkEntry {
    pub fn new(service: Arc<dyn DataService>, signal: RefreshSignal) -> Self {
        Self {
            service,
            signal,
            accounts: Vec::new(),
            drafts: vec![Draft::new(None)],
        }
    }

    /// Accounts offered for selection in each row.
    pub fn accounts(&self) -> &[AccountRef] {
        &self.accounts
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    fn default_account(&self) -> Option<AccountId> {
        self.accounts.first().map(|account| account.id)
    }

    /// Load the account list and seed a single draft for the first account.
    pub async fn mount(&mut self) -> Outcome {
        match self.service.select_account_balances().await {
            Ok(balances) => {
                debug!(count = balances.len(), "bulk entry loaded accounts");
                self.accounts = balances.iter().map(AccountRef::from).collect();
                self.drafts = vec![Draft::new(self.default_account())];
                Outcome::Done
            }
            Err(err) => {
                error!(error = %err, "loading accounts for bulk entry failed");
                Outcome::Failed
            }
        }
    }

    /// Replace the known accounts without touching existing drafts.
    pub fn set_accounts(&mut self, balances: &[AccountBalance]) {
        self.accounts = balances.iter().map(AccountRef::from).collect();
    }

    pub fn add_row(&mut self) {
        self.drafts.push(Draft::new(self.default_account()));
    }

    /// Remove the row at `index`. Returns false if there is no such row.
    pub fn remove_row(&mut self, index: usize) -> bool {
        if index >= self.drafts.len() {
            warn!(index, rows = self.drafts.len(), "remove_row out of range");
            return false;
        }
        self.drafts.remove(index);
        true
    }

    /// Set one field of the row at `index`. Returns false if there is no such row.
    pub fn update_field(&mut self, index: usize, field: DraftField) -> bool {
        let Some(draft) = self.drafts.get_mut(index) else {
            warn!(index, "update_field out of range");
            return false;
        };

        match field {
            DraftField::Account(account_id) => draft.account_id = account_id,
            DraftField::Date(date) => draft.transaction_date = date,
            DraftField::Type(kind) => draft.kind = kind,
            DraftField::Amount(amount) => draft.amount = amount,
            DraftField::Description(description) => draft.description = description,
        }
        true
    }

    /// Insert every complete draft in one batch.
    ///
    /// Incomplete rows are dropped without notice. The batch is all-or-nothing:
    /// on failure every draft stays as it was.
    pub async fn submit_all(&mut self) -> Outcome {
        let rows: Vec<NewTransaction> = self
            .drafts
            .iter()
            .filter_map(Draft::to_new_transaction)
            .collect();

        if rows.is_empty() {
            return Outcome::Skipped;
        }

        let count = rows.len();
        if let Err(err) = self.service.insert_transactions(rows).await {
            error!(count, error = %err, "bulk insert failed");
            return Outcome::Failed;
        }

        info!(count, skipped = self.drafts.len() - count, "bulk transactions saved");
        self.drafts = vec![Draft::new(self.default_account())];
        self.signal.notify();
        Outcome::Done
    }
}
