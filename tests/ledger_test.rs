mod common;

use std::sync::Arc;

use anyhow::Result;
use bookkeeper::application::{Ledger, Outcome, RefreshReceiver, RefreshSignal};
use bookkeeper::domain::{AccountRef, NewAccount, NewTransaction, TransactionType};
use bookkeeper::storage::DataService;
use common::{date, test_service, FlakyService};
use tempfile::TempDir;

/// Ledger over a fresh account, plus the receiving end of its refresh signal
async fn ledger_for(
    name: &str,
) -> Result<(Ledger, Arc<FlakyService>, RefreshReceiver, TempDir)> {
    let (service, temp) = test_service().await?;
    let account = service.insert_account(NewAccount::new(name, "001")).await?;
    let (signal, receiver) = RefreshSignal::channel();
    let ledger = Ledger::new(service.clone(), signal, account.to_ref());
    Ok((ledger, service, receiver, temp))
}

#[tokio::test]
async fn test_missing_amount_is_rejected() -> Result<()> {
    let (mut ledger, service, mut changes, _temp) = ledger_for("Checking").await?;
    let writes_before = service.write_calls();

    let outcome = ledger
        .add_transaction(None, TransactionType::Debit, "coffee", date("2024-01-01"))
        .await;

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(service.write_calls(), writes_before);
    assert!(ledger.transactions().is_empty());
    assert!(!changes.take());
    // The typed description stays in the form
    assert_eq!(ledger.form().description, "coffee");

    Ok(())
}

#[tokio::test]
async fn test_add_clears_amount_but_keeps_date_and_type() -> Result<()> {
    let (mut ledger, _service, mut changes, _temp) = ledger_for("Checking").await?;

    let outcome = ledger
        .add_transaction(Some(1999), TransactionType::Credit, "refund", date("2024-05-10"))
        .await;
    assert_eq!(outcome, Outcome::Done);
    assert!(changes.take());

    let form = ledger.form();
    assert_eq!(form.amount, None);
    assert!(form.description.is_empty());
    assert_eq!(form.kind, TransactionType::Credit);
    assert_eq!(form.transaction_date, date("2024-05-10"));

    let transactions = ledger.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, 1999);
    assert_eq!(transactions[0].description.as_deref(), Some("refund"));

    Ok(())
}

#[tokio::test]
async fn test_blank_description_is_stored_as_absent() -> Result<()> {
    let (mut ledger, _service, _changes, _temp) = ledger_for("Checking").await?;

    let _ = ledger
        .add_transaction(Some(500), TransactionType::Debit, "", date("2024-01-01"))
        .await;

    assert_eq!(ledger.transactions()[0].description, None);

    Ok(())
}

#[tokio::test]
async fn test_add_failure_keeps_form_and_list() -> Result<()> {
    let (mut ledger, service, mut changes, _temp) = ledger_for("Checking").await?;

    service.set_fail_writes(true);
    let outcome = ledger
        .add_transaction(Some(1000), TransactionType::Debit, "rent", date("2024-01-01"))
        .await;

    assert_eq!(outcome, Outcome::Failed);
    assert!(!changes.take());
    assert!(ledger.transactions().is_empty());
    assert_eq!(ledger.form().amount, Some(1000));
    assert_eq!(ledger.form().description, "rent");

    Ok(())
}

#[tokio::test]
async fn test_transactions_are_listed_newest_date_first() -> Result<()> {
    let (mut ledger, service, _changes, _temp) = ledger_for("Checking").await?;
    let account_id = ledger.account().id;

    service
        .insert_transactions(vec![
            NewTransaction::new(account_id, 1, TransactionType::Credit, date("2024-01-15")),
            NewTransaction::new(account_id, 2, TransactionType::Credit, date("2024-03-01")),
            NewTransaction::new(account_id, 3, TransactionType::Debit, date("2023-12-31")),
        ])
        .await?;

    assert_eq!(ledger.fetch_transactions().await, Outcome::Done);
    let dates: Vec<_> = ledger
        .transactions()
        .iter()
        .map(|t| t.transaction_date.to_string())
        .collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-01-15", "2023-12-31"]);

    Ok(())
}

#[tokio::test]
async fn test_delete_failure_leaves_list_unchanged() -> Result<()> {
    let (mut ledger, service, mut changes, _temp) = ledger_for("Checking").await?;
    let _ = ledger
        .add_transaction(Some(700), TransactionType::Debit, "", date("2024-01-01"))
        .await;
    assert!(changes.take());

    let id = ledger.transactions()[0].id;
    service.set_fail_writes(true);
    let outcome = ledger.delete_transaction(id, &|_: &str| true).await;

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(ledger.transactions().len(), 1);
    assert!(!changes.take());

    Ok(())
}

#[tokio::test]
async fn test_delete_notifies_after_success() -> Result<()> {
    let (mut ledger, _service, mut changes, _temp) = ledger_for("Checking").await?;
    let _ = ledger
        .add_transaction(Some(700), TransactionType::Debit, "", date("2024-01-01"))
        .await;
    let _ = changes.take();

    let id = ledger.transactions()[0].id;
    let prompts = std::cell::RefCell::new(Vec::new());
    let confirm = |prompt: &str| {
        prompts.borrow_mut().push(prompt.to_string());
        true
    };

    assert_eq!(ledger.delete_transaction(id, &confirm).await, Outcome::Done);
    assert!(ledger.transactions().is_empty());
    assert!(changes.take());
    assert_eq!(prompts.borrow().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_changing_account_refetches() -> Result<()> {
    let (mut ledger, service, _changes, _temp) = ledger_for("Checking").await?;
    let checking = ledger.account().id;
    let savings = service.insert_account(NewAccount::new("Savings", "002")).await?;

    service
        .insert_transactions(vec![
            NewTransaction::new(checking, 100, TransactionType::Credit, date("2024-01-01")),
            NewTransaction::new(savings.id, 200, TransactionType::Credit, date("2024-01-01")),
            NewTransaction::new(savings.id, 300, TransactionType::Debit, date("2024-01-02")),
        ])
        .await?;
    let _ = ledger.fetch_transactions().await;
    assert_eq!(ledger.transactions().len(), 1);

    assert_eq!(ledger.set_account(AccountRef::from(&savings)).await, Outcome::Done);
    assert_eq!(ledger.account().id, savings.id);
    assert_eq!(ledger.transactions().len(), 2);
    assert!(ledger.transactions().iter().all(|t| t.account_id == savings.id));

    // Same account again does not refetch
    assert_eq!(ledger.set_account(savings.to_ref()).await, Outcome::Skipped);

    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_keeps_list() -> Result<()> {
    let (mut ledger, service, _changes, _temp) = ledger_for("Checking").await?;
    let _ = ledger
        .add_transaction(Some(100), TransactionType::Credit, "", date("2024-01-01"))
        .await;

    service.set_fail_reads(true);
    assert_eq!(ledger.fetch_transactions().await, Outcome::Failed);
    assert_eq!(ledger.transactions().len(), 1);

    Ok(())
}
