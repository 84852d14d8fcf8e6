use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money leaving the account (balance decreases)
    #[default]
    Debit,
    /// Money entering the account (balance increases)
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown transaction type: {0}")]
pub struct ParseTransactionTypeError(pub String);

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" => Ok(TransactionType::Debit),
            "credit" => Ok(TransactionType::Credit),
            _ => Err(ParseTransactionTypeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ledger entry. Transactions are created and deleted, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: Cents,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: Option<String>,
    /// Date the user assigned to the entry
    pub transaction_date: NaiveDate,
    /// When the data service recorded it
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Materialize an insert payload with a fresh id and creation time.
    pub fn create(new: NewTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: new.account_id,
            amount: new.amount,
            kind: new.kind,
            description: new.description,
            transaction_date: new.transaction_date,
            created_at: Utc::now(),
        }
    }
}

/// Insert payload for the `transactions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Cents,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
}

impl NewTransaction {
    pub fn new(
        account_id: AccountId,
        amount: Cents,
        kind: TransactionType,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            account_id,
            amount,
            kind,
            description: None,
            transaction_date,
        }
    }

    /// Blank descriptions are stored as absent.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        let trimmed = description.trim();
        self.description = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }
}

/// Today's date in UTC, the default for new entries.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
