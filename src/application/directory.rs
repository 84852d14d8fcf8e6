use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::domain::{
    Account, AccountBalance, AccountId, Cents, NewAccount, TransactionId, TransactionType,
};
use crate::storage::DataService;

use super::{AppError, BulkEntry, Confirm, Ledger, Outcome, RefreshReceiver, RefreshSignal};

/// State of the "add account" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountForm {
    pub open: bool,
    pub name: String,
    pub account_number: String,
}

/// Root controller: owns the account list, the selection, and the ledger and
/// bulk entry children.
///
/// Children raise a [`RefreshSignal`] after every successful transaction
/// mutation; [`AccountDirectory::sync`] turns pending signals into a balance
/// refresh. The composite methods (`add_transaction`, `delete_transaction`,
/// `submit_bulk`) do that automatically. Callers that drive a child directly
/// through `ledger_mut`/`bulk_mut` call `sync` themselves.
pub struct AccountDirectory {
    service: Arc<dyn DataService>,
    signal: RefreshSignal,
    changes: RefreshReceiver,
    accounts: Vec<AccountBalance>,
    selected: Option<AccountBalance>,
    form: AccountForm,
    ledger: Option<Ledger>,
    bulk: BulkEntry,
}

impl AccountDirectory {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        let (signal, changes) = RefreshSignal::channel();
        let bulk = BulkEntry::new(service.clone(), signal.clone());
        Self {
            service,
            signal,
            changes,
            accounts: Vec::new(),
            selected: None,
            form: AccountForm::default(),
            ledger: None,
            bulk,
        }
    }

    /// Initial load: account list, then the bulk entry grid.
    pub async fn mount(&mut self) -> Outcome {
        let listed = self.list_accounts().await;
        let mounted = self.bulk.mount().await;
        if listed == Outcome::Failed || mounted == Outcome::Failed {
            Outcome::Failed
        } else {
            Outcome::Done
        }
    }

    // ========================
    // Accounts
    // ========================

    pub fn accounts(&self) -> &[AccountBalance] {
        &self.accounts
    }

    /// Replace the account snapshot. On failure the previous snapshot stays.
    pub async fn list_accounts(&mut self) -> Outcome {
        match self.service.select_account_balances().await {
            Ok(balances) => {
                debug!(count = balances.len(), "fetched account balances");
                self.bulk.set_accounts(&balances);
                self.accounts = balances;
                Outcome::Done
            }
            Err(err) => {
                error!(error = %err, "fetching accounts failed");
                Outcome::Failed
            }
        }
    }

    /// Find an account in the current snapshot by id, name or account number.
    pub fn find_account(&self, key: &str) -> Result<&AccountBalance, AppError> {
        let key = key.trim();
        let by_id = AccountId::parse_str(key).ok();

        self.accounts
            .iter()
            .find(|a| Some(a.id) == by_id)
            .or_else(|| self.accounts.iter().find(|a| a.name == key))
            .or_else(|| self.accounts.iter().find(|a| a.account_number == key))
            .ok_or_else(|| AppError::AccountNotFound(key.to_string()))
    }

    /// Full `accounts` row (description, creation time) for an account.
    pub async fn account_record(&self, account_id: AccountId) -> Result<Account, AppError> {
        self.service
            .select_accounts()
            .await?
            .into_iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))
    }

    pub fn form(&self) -> &AccountForm {
        &self.form
    }

    pub fn open_create_form(&mut self) {
        self.form.open = true;
    }

    pub fn close_create_form(&mut self) {
        self.form.open = false;
    }

    pub fn toggle_create_form(&mut self) {
        self.form.open = !self.form.open;
    }

    /// Submit the account form with the given values.
    ///
    /// Empty fields are a no-op. On failure the form stays open with its
    /// values; on success it is cleared, closed and the list reloaded.
    pub async fn create_account(&mut self, name: &str, account_number: &str) -> Outcome {
        self.form.name = name.to_string();
        self.form.account_number = account_number.to_string();

        let name = name.trim();
        let account_number = account_number.trim();
        if name.is_empty() || account_number.is_empty() {
            return Outcome::Skipped;
        }

        let account = match self
            .service
            .insert_account(NewAccount::new(name, account_number))
            .await
        {
            Ok(account) => account,
            Err(err) => {
                error!(name, account_number, error = %err, "adding account failed");
                return Outcome::Failed;
            }
        };

        info!(account_id = %account.id, name = %account.name, "account created");
        self.form = AccountForm::default();

        let _ = self.list_accounts().await;
        Outcome::Done
    }

    // ========================
    // Selection
    // ========================

    pub fn selected(&self) -> Option<&AccountBalance> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, account_id: AccountId) -> bool {
        self.selected.as_ref().is_some_and(|a| a.id == account_id)
    }

    /// Select an account from the current snapshot and show its ledger.
    pub async fn select_account(&mut self, account_id: AccountId) -> Outcome {
        let Some(account) = self.accounts.iter().find(|a| a.id == account_id).cloned() else {
            warn!(%account_id, "selected account is not in the list");
            return Outcome::Skipped;
        };

        let account_ref = account.to_ref();
        self.selected = Some(account);

        if let Some(ledger) = self.ledger.as_mut() {
            // Same account: the ledger keeps its list.
            return match ledger.set_account(account_ref).await {
                Outcome::Skipped => Outcome::Done,
                fetched => fetched,
            };
        }

        let mut ledger = Ledger::new(self.service.clone(), self.signal.clone(), account_ref);
        let fetched = ledger.fetch_transactions().await;
        self.ledger = Some(ledger);
        fetched
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.ledger = None;
    }

    /// Reload balances and re-resolve the selection by id.
    ///
    /// A selected account that vanished from the list keeps its last known
    /// snapshot.
    pub async fn refresh_balances(&mut self) -> Outcome {
        let balances = match self.service.select_account_balances().await {
            Ok(balances) => balances,
            Err(err) => {
                error!(error = %err, "refreshing balances failed");
                return Outcome::Failed;
            }
        };

        if let Some(selected) = self.selected.as_mut() {
            match balances.iter().find(|a| a.id == selected.id) {
                Some(updated) => *selected = updated.clone(),
                None => warn!(account_id = %selected.id, "selected account missing after refresh"),
            }
        }

        self.bulk.set_accounts(&balances);
        self.accounts = balances;
        Outcome::Done
    }

    /// Refresh balances if a child signalled a mutation since the last sync.
    pub async fn sync(&mut self) -> bool {
        if !self.changes.take() {
            return false;
        }
        let _ = self.refresh_balances().await;
        true
    }

    // ========================
    // Children
    // ========================

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn ledger_mut(&mut self) -> Option<&mut Ledger> {
        self.ledger.as_mut()
    }

    pub fn bulk(&self) -> &BulkEntry {
        &self.bulk
    }

    pub fn bulk_mut(&mut self) -> &mut BulkEntry {
        &mut self.bulk
    }

    /// Add a transaction to the selected account's ledger, then sync balances.
    pub async fn add_transaction(
        &mut self,
        amount: Option<Cents>,
        kind: TransactionType,
        description: &str,
        transaction_date: NaiveDate,
    ) -> Outcome {
        let Some(ledger) = self.ledger.as_mut() else {
            warn!("no account selected");
            return Outcome::Skipped;
        };
        let outcome = ledger
            .add_transaction(amount, kind, description, transaction_date)
            .await;
        self.sync().await;
        outcome
    }

    /// Delete a transaction from the selected account's ledger, then sync balances.
    pub async fn delete_transaction(&mut self, id: TransactionId, confirm: &dyn Confirm) -> Outcome {
        let Some(ledger) = self.ledger.as_mut() else {
            warn!("no account selected");
            return Outcome::Skipped;
        };
        let outcome = ledger.delete_transaction(id, confirm).await;
        self.sync().await;
        outcome
    }

    /// Submit the bulk entry grid, then sync balances.
    pub async fn submit_bulk(&mut self) -> Outcome {
        let outcome = self.bulk.submit_all().await;
        self.sync().await;
        outcome
    }
}
