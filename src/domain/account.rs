use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type AccountId = Uuid;

/// An account as stored by the data service.
/// Accounts are never edited or deleted once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// External reference, e.g. the bank's account number
    pub account_number: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Materialize an insert payload with a fresh id and creation time.
    pub fn create(new: NewAccount) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            account_number: new.account_number,
            description: new.description,
            created_at: Utc::now(),
        }
    }

    pub fn to_ref(&self) -> AccountRef {
        AccountRef {
            id: self.id,
            name: self.name.clone(),
            account_number: self.account_number.clone(),
        }
    }
}

/// Insert payload for the `accounts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub account_number: String,
    pub description: Option<String>,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_number: account_number.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Row of the `account_balances` view.
///
/// `balance` is aggregated by the data service (credits add, debits subtract)
/// and is only ever read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: AccountId,
    pub name: String,
    pub description: Option<String>,
    pub balance: Cents,
    pub account_number: String,
}

impl AccountBalance {
    pub fn to_ref(&self) -> AccountRef {
        AccountRef {
            id: self.id,
            name: self.name.clone(),
            account_number: self.account_number.clone(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.balance < 0
    }
}

/// Minimal identity of an account, handed to views that must not carry
/// balance state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: AccountId,
    pub name: String,
    pub account_number: String,
}

impl From<&AccountBalance> for AccountRef {
    fn from(balance: &AccountBalance) -> Self {
        balance.to_ref()
    }
}

impl From<&Account> for AccountRef {
    fn from(account: &Account) -> Self {
        account.to_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_keeps_payload_fields() {
        let account = Account::create(NewAccount::new("Checking", "001-42").with_description("main"));
        assert_eq!(account.name, "Checking");
        assert_eq!(account.account_number, "001-42");
        assert_eq!(account.description.as_deref(), Some("main"));
    }

    #[test]
    fn test_refs_carry_identity_only() {
        let account = Account::create(NewAccount::new("Savings", "002"));
        let balance = AccountBalance {
            id: account.id,
            name: account.name.clone(),
            description: None,
            balance: -150,
            account_number: account.account_number.clone(),
        };

        assert_eq!(AccountRef::from(&account), AccountRef::from(&balance));
        assert!(balance.is_negative());
    }
}
