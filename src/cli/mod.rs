use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::application::{AccountDirectory, AppError, Confirm, DraftField, Outcome};
use crate::domain::{format_cents, parse_cents, today, AccountBalance, Transaction, TransactionType};
use crate::storage::{database_url, Repository};

/// Bookkeeper - accounts, ledgers and bulk transaction entry
#[derive(Parser)]
#[command(name = "bookkeeper")]
#[command(about = "Track account balances and enter transactions one by one or in bulk")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BOOKKEEPER_DATABASE", default_value = "bookkeeper.db")]
    pub database: String,

    /// Log operations to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// List accounts with their balances
    Accounts {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Show the transactions of one account, newest first
    Ledger {
        /// Account id, name or number
        account: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Add a transaction to an account
    Add {
        /// Account id, name or number
        account: String,

        /// Amount (e.g., "30.00" or "30")
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// debit or credit
        #[arg(short = 't', long = "type", default_value = "debit")]
        kind: String,

        /// Transaction date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Account id, name or number
        account: String,

        /// Transaction id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Enter many transactions at once from CSV (account,date,type,amount,description)
    Bulk {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Show the draft rows without saving
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Display name
        name: String,

        /// External account number
        account_number: String,
    },

    /// Show the full record of an account
    Show {
        /// Account id, name or number
        account: String,
    },
}

/// One CSV record of the bulk command.
#[derive(Debug, Deserialize)]
struct BulkRecord {
    account: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Install the tracing subscriber. `BOOKKEEPER_LOG` overrides the level.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("BOOKKEEPER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                Repository::init(&database_url(&self.database, true)).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Accounts { format } => {
                let directory = open_directory(&self.database).await?;
                print_accounts(directory.accounts(), format)?;
            }

            Commands::Account(account_cmd) => {
                run_account_command(&self.database, account_cmd).await?;
            }

            Commands::Ledger { account, format } => {
                let mut directory = open_directory(&self.database).await?;
                let account_id = directory.find_account(&account)?.id;
                require_done(
                    directory.select_account(account_id).await,
                    "Failed to load transactions",
                )?;
                print_ledger(&directory, format)?;
            }

            Commands::Add {
                account,
                amount,
                kind,
                date,
                description,
            } => {
                let mut directory = open_directory(&self.database).await?;
                let account_id = directory.find_account(&account)?.id;
                let amount = parse_cents(&amount).map_err(AppError::from)?;
                let kind = parse_type(&kind)?;
                let date = date.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);

                require_done(
                    directory.select_account(account_id).await,
                    "Failed to load transactions",
                )?;
                require_done(
                    directory
                        .add_transaction(
                            Some(amount),
                            kind,
                            description.as_deref().unwrap_or(""),
                            date,
                        )
                        .await,
                    "Failed to add transaction",
                )?;

                println!("Recorded {} {} on {}", kind, format_cents(amount), date);
                print_selected_balance(&directory);
            }

            Commands::Delete { account, id, yes } => {
                let mut directory = open_directory(&self.database).await?;
                let account_id = directory.find_account(&account)?.id;
                let transaction_id =
                    Uuid::parse_str(&id).context("Invalid transaction ID format (expected UUID)")?;

                require_done(
                    directory.select_account(account_id).await,
                    "Failed to load transactions",
                )?;
                let belongs = directory
                    .ledger()
                    .is_some_and(|l| l.transactions().iter().any(|t| t.id == transaction_id));
                if !belongs {
                    bail!("Transaction {} not found in account {}", transaction_id, account);
                }

                let always = |_: &str| true;
                let confirm: &dyn Confirm = if yes { &always } else { &confirm_on_stdin };

                match directory.delete_transaction(transaction_id, confirm).await {
                    Outcome::Done => {
                        println!("Deleted transaction {}", transaction_id);
                        print_selected_balance(&directory);
                    }
                    Outcome::Skipped => println!("Cancelled"),
                    Outcome::Failed => bail!("Failed to delete transaction (see log)"),
                }
            }

            Commands::Bulk { input, dry_run } => {
                let mut directory = open_directory(&self.database).await?;
                run_bulk_command(&mut directory, input.as_deref(), dry_run).await?;
            }
        }

        Ok(())
    }
}

async fn open_directory(database: &str) -> Result<AccountDirectory> {
    let repo = Repository::connect(&database_url(database, false)).await?;
    let mut directory = AccountDirectory::new(Arc::new(repo));
    require_done(directory.mount().await, "Failed to load accounts")?;
    Ok(directory)
}

fn require_done(outcome: Outcome, message: &str) -> Result<()> {
    if outcome == Outcome::Failed {
        bail!("{} (see log)", message);
    }
    Ok(())
}

fn parse_date(input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(input.to_string()))
}

fn parse_type(input: &str) -> Result<TransactionType, AppError> {
    input
        .parse()
        .map_err(|_| AppError::InvalidTransactionType(input.to_string()))
}

fn confirm_on_stdin(prompt: &str) -> bool {
    eprint!("{} [y/N] ", prompt);
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn run_account_command(database: &str, cmd: AccountCommands) -> Result<()> {
    let mut directory = open_directory(database).await?;

    match cmd {
        AccountCommands::Create {
            name,
            account_number,
        } => {
            directory.open_create_form();
            match directory.create_account(&name, &account_number).await {
                Outcome::Done => {}
                Outcome::Skipped => bail!("Account name and number are required"),
                Outcome::Failed => bail!("Failed to create account (see log)"),
            }

            let created = directory
                .accounts()
                .iter()
                .rev()
                .find(|a| a.name == name.trim() && a.account_number == account_number.trim());
            match created {
                Some(account) => println!("Created account: {} ({})", account.name, account.id),
                None => println!("Created account: {}", name.trim()),
            }
        }

        AccountCommands::Show { account } => {
            let (account_id, balance) = {
                let found = directory.find_account(&account)?;
                (found.id, found.balance)
            };
            let record = directory.account_record(account_id).await?;

            println!("Account: {}", record.name);
            println!("  ID:       {}", record.id);
            println!("  Number:   {}", record.account_number);
            if let Some(desc) = &record.description {
                println!("  Desc:     {}", desc);
            }
            println!("  Balance:  {}", format_cents(balance));
            println!("  Created:  {}", record.created_at.format("%Y-%m-%d %H:%M"));
        }
    }

    Ok(())
}

async fn run_bulk_command(
    directory: &mut AccountDirectory,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let reader: Box<dyn Read> = match input {
        Some(path) => Box::new(
            std::fs::File::open(path).with_context(|| format!("Failed to open {}", path))?,
        ),
        None => Box::new(std::io::stdin()),
    };

    load_drafts(directory, reader)?;

    let drafts = directory.bulk().drafts();
    let complete = drafts.iter().filter(|d| d.is_complete()).count();
    let total = drafts.len();

    if dry_run {
        println!("{:<12} {:<20} {:<7} {:>12}  DESCRIPTION", "DATE", "ACCOUNT", "TYPE", "AMOUNT");
        for draft in drafts {
            let account = draft
                .account_id
                .and_then(|id| directory.accounts().iter().find(|a| a.id == id))
                .map(|a| a.name.as_str())
                .unwrap_or("-");
            let amount = draft.amount.map(format_cents).unwrap_or_else(|| "-".to_string());
            println!(
                "{:<12} {:<20} {:<7} {:>12}  {}",
                draft.transaction_date, account, draft.kind, amount, draft.description
            );
        }
        println!("\n{} of {} rows would be saved", complete, total);
        return Ok(());
    }

    match directory.submit_bulk().await {
        Outcome::Done => {
            println!("Saved {} transaction(s), skipped {} incomplete row(s)", complete, total - complete);
            print_accounts(directory.accounts(), OutputFormat::Table)?;
        }
        Outcome::Skipped => println!("No complete rows to save"),
        Outcome::Failed => bail!("Bulk insert failed, nothing was saved (see log)"),
    }

    Ok(())
}

/// Fill the bulk entry grid from CSV (`account,date,type,amount,description`),
/// one draft per record. Unknown accounts and unreadable amounts leave the
/// field unset, so the row is dropped on submit. Returns the number of rows.
fn load_drafts<R: Read>(directory: &mut AccountDirectory, reader: R) -> Result<usize> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = 0;
    for (index, record) in csv_reader.deserialize::<BulkRecord>().enumerate() {
        let line = index + 2;
        let record = record.with_context(|| format!("Invalid CSV record on line {}", line))?;

        if index > 0 {
            directory.bulk_mut().add_row();
        }
        rows += 1;

        let account_id = match directory.find_account(&record.account) {
            Ok(account) => Some(account.id),
            Err(_) => {
                warn!(line, account = %record.account, "unknown account, row will be skipped");
                None
            }
        };
        let amount = match record
            .amount
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(parse_cents)
            .transpose()
        {
            Ok(amount) => amount,
            Err(err) => {
                warn!(line, error = %err, "unreadable amount, row will be skipped");
                None
            }
        };

        let bulk = directory.bulk_mut();
        bulk.update_field(index, DraftField::Account(account_id));
        bulk.update_field(index, DraftField::Amount(amount));
        if let Some(date) = record.date.as_deref().filter(|d| !d.is_empty()) {
            let date = parse_date(date).with_context(|| format!("Line {}", line))?;
            bulk.update_field(index, DraftField::Date(date));
        }
        if let Some(kind) = record.kind.as_deref().filter(|k| !k.is_empty()) {
            let kind = parse_type(kind).with_context(|| format!("Line {}", line))?;
            bulk.update_field(index, DraftField::Type(kind));
        }
        if let Some(description) = record.description {
            bulk.update_field(index, DraftField::Description(description));
        }
    }
    Ok(rows)
}

fn print_selected_balance(directory: &AccountDirectory) {
    if let Some(account) = directory.selected() {
        println!("Balance of {}: {}", account.name, format_cents(account.balance));
    }
}

fn print_accounts(accounts: &[AccountBalance], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }
            println!("{:<24} {:<16} {:>14}", "NAME", "NUMBER", "BALANCE");
            println!("{}", "-".repeat(56));
            for account in accounts {
                let marker = if account.is_negative() { " !" } else { "" };
                println!(
                    "{:<24} {:<16} {:>14}{}",
                    account.name,
                    account.account_number,
                    format_cents(account.balance),
                    marker
                );
                if let Some(desc) = &account.description {
                    println!("  {}", desc);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(accounts)?),
        OutputFormat::Csv => write_csv(accounts)?,
    }
    Ok(())
}

fn print_ledger(directory: &AccountDirectory, format: OutputFormat) -> Result<()> {
    let Some(ledger) = directory.ledger() else {
        bail!("No account selected");
    };
    let transactions = ledger.transactions();

    match format {
        OutputFormat::Table => {
            println!("{}", ledger.heading());
            if let Some(account) = directory.selected() {
                println!("Balance: {}", format_cents(account.balance));
            }
            println!();
            if transactions.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }
            println!("{:<12} {:<7} {:>12}  {:<30} ID", "DATE", "TYPE", "AMOUNT", "DESCRIPTION");
            println!("{}", "-".repeat(100));
            for tx in transactions {
                println!(
                    "{:<12} {:<7} {:>12}  {:<30} {}",
                    tx.transaction_date,
                    tx.kind,
                    format_cents(tx.amount),
                    tx.description.as_deref().unwrap_or(""),
                    tx.id
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(transactions)?),
        OutputFormat::Csv => write_csv::<Transaction>(transactions)?,
    }
    Ok(())
}

fn write_csv<T: serde::Serialize>(rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
