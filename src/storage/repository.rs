use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Account, AccountBalance, AccountId, NewAccount, NewTransaction, Transaction, TransactionId,
    TransactionType,
};

use super::{DataService, MIGRATION_001_INITIAL};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Build a sqlx SQLite URL for a database file.
/// With `create` the file is created when missing.
pub fn database_url(path: &str, create: bool) -> String {
    if create {
        format!("sqlite:{}?mode=rwc", path)
    } else {
        format!("sqlite:{}", path)
    }
}

/// SQLite-backed data service.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database at the given sqlx URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    fn timestamp(dt: &DateTime<Utc>) -> String {
        // Fixed width keeps lexical order equal to chronological order.
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .context("Invalid created_at timestamp")?
            .with_timezone(&Utc))
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            name: row.get("name"),
            account_number: row.get("account_number"),
            description: row.get("description"),
            created_at: Self::parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> Result<AccountBalance> {
        let id_str: String = row.get("id");

        Ok(AccountBalance {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            name: row.get("name"),
            description: row.get("description"),
            balance: row.get("balance"),
            account_number: row.get("account_number"),
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let type_str: String = row.get("type");
        let date_str: String = row.get("transaction_date");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            amount: row.get("amount_cents"),
            kind: type_str.parse::<TransactionType>().context("Invalid transaction type")?,
            description: row.get("description"),
            transaction_date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .context("Invalid transaction_date")?,
            created_at: Self::parse_timestamp(&created_at_str)?,
        })
    }
}

#[async_trait]
impl DataService for Repository {
    async fn select_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, account_number, description, created_at
            FROM accounts
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    async fn insert_account(&self, new: NewAccount) -> Result<Account> {
        let account = Account::create(new);

        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, account_number, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.account_number)
        .bind(&account.description)
        .bind(Self::timestamp(&account.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        debug!(account_id = %account.id, name = %account.name, "inserted account");
        Ok(account)
    }

    async fn select_account_balances(&self) -> Result<Vec<AccountBalance>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, balance, account_number
            FROM account_balances
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list account balances")?;

        rows.iter().map(Self::row_to_balance).collect()
    }

    async fn select_transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount_cents, type, description, transaction_date, created_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY transaction_date DESC, created_at DESC
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    async fn insert_transactions(&self, rows: Vec<NewTransaction>) -> Result<Vec<Transaction>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction batch")?;

        let mut inserted = Vec::with_capacity(rows.len());
        for new in rows {
            let transaction = Transaction::create(new);

            sqlx::query(
                r#"
                INSERT INTO transactions (id, account_id, amount_cents, type, description, transaction_date, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(transaction.id.to_string())
            .bind(transaction.account_id.to_string())
            .bind(transaction.amount)
            .bind(transaction.kind.as_str())
            .bind(&transaction.description)
            .bind(transaction.transaction_date.format(DATE_FORMAT).to_string())
            .bind(Self::timestamp(&transaction.created_at))
            .execute(&mut *tx)
            .await
            .context("Failed to save transaction")?;

            inserted.push(transaction);
        }

        tx.commit()
            .await
            .context("Failed to commit transaction batch")?;

        debug!(count = inserted.len(), "inserted transactions");
        Ok(inserted)
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;

        debug!(transaction_id = %id, rows = result.rows_affected(), "deleted transaction");
        Ok(())
    }
}
