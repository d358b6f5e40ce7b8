use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::application::{AppError, ErrorCategory, LedgerService};
use crate::domain::{format_amount, parse_amount, Account, AccountId, NewAccount, Page, Transaction};
use crate::storage::StoreConfig;

/// Exit status for a storage or other unexpected failure.
pub const EXIT_INTERNAL: u8 = 1;
/// Exit status for a request refused by a ledger rule.
pub const EXIT_REJECTED: u8 = 2;
/// Exit status for a reference to a missing account.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Coffer - bank-account ledger
#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "Manage bank accounts and record transfers between them")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "COFFER_DATABASE", default_value = "coffer.db")]
    pub database: String,

    /// How long to wait for a locked database, in milliseconds
    #[arg(long, env = "COFFER_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Show the transaction history of an account
    Transactions {
        /// Account ID
        id: AccountId,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = 20)]
        size: u32,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Transfer money from one account to another
    Transfer {
        /// Source account ID
        from: AccountId,

        /// Destination account ID
        #[arg(long)]
        to: AccountId,

        /// Amount to transfer (e.g., "50.00" or "50")
        #[arg(short, long)]
        amount: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account holder name
        holder: String,

        /// Contact email
        #[arg(short, long)]
        email: Option<String>,

        /// Opening balance (e.g., "100.00")
        #[arg(short, long, default_value = "0")]
        balance: String,
    },

    /// Show an account
    Show {
        /// Account ID
        id: AccountId,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// List accounts
    List {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = 20)]
        size: u32,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show the current balance of an account
    Balance {
        /// Account ID
        id: AccountId,
    },

    /// Delete an account and its transaction history
    Delete {
        /// Account ID
        id: AccountId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl Commands {
    /// Transfer failures are all reported as rejections, including unknown
    /// account ids.
    pub fn is_transfer(&self) -> bool {
        matches!(self, Commands::Transfer { .. })
    }
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::for_path(&self.database)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub async fn run(self) -> Result<()> {
        let config = self.store_config();

        match self.command {
            Commands::Init => {
                LedgerService::init_with(&config).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect_with(&config).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Transactions {
                id,
                page,
                size,
                format,
            } => {
                let service = LedgerService::connect_with(&config).await?;
                let transactions = service.get_account_transactions(id, page, size).await?;
                print_transactions(&transactions, format)?;
            }

            Commands::Transfer { from, to, amount } => {
                let service = LedgerService::connect_with(&config).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let receipt = service.transfer(from, to, amount).await?;
                tracing::debug!(
                    debit = receipt.debit.id,
                    credit = receipt.credit.id,
                    "recorded transfer entries"
                );
                println!("Transfer successful");
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            holder,
            email,
            balance,
        } => {
            let balance = parse_amount(&balance)
                .context("Invalid balance format. Use '100.00' or '100'")?;
            let mut new_account = NewAccount::new(holder, balance);
            if let Some(email) = email {
                new_account = new_account.with_email(email);
            }

            let account = service.create_account(new_account).await?;
            println!(
                "Created account {}: {} ({})",
                account.id,
                account.holder_name,
                format_amount(account.balance)
            );
        }

        AccountCommands::Show { id, format } => {
            let account = service.get_account(id).await?;
            match format {
                OutputFormat::Table => {
                    println!("Account: {}", account.id);
                    println!("  Holder:   {}", account.holder_name);
                    if let Some(email) = &account.email {
                        println!("  Email:    {}", email);
                    }
                    println!("  Balance:  {}", format_amount(account.balance));
                    println!(
                        "  Created:  {}",
                        account.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&account)?),
                OutputFormat::Csv => write_csv(std::slice::from_ref(&account))?,
            }
        }

        AccountCommands::List { page, size, format } => {
            let accounts = service.list_accounts(page, size).await?;
            print_accounts(&accounts, format)?;
        }

        AccountCommands::Balance { id } => {
            let balance = service.get_account_balance(id).await?;
            println!("{}", format_amount(balance));
        }

        AccountCommands::Delete { id } => {
            service.delete_account(id).await?;
            println!("Deleted account: {}", id);
        }
    }

    Ok(())
}

fn print_accounts(accounts: &Page<Account>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(accounts)?),
        OutputFormat::Csv => write_csv(&accounts.content)?,
        OutputFormat::Table => {
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<8} {:<24} {:<28} {:>16}",
                    "ID", "HOLDER", "EMAIL", "BALANCE"
                );
                println!("{}", "-".repeat(79));
                for account in &accounts.content {
                    println!(
                        "{:<8} {:<24} {:<28} {:>16}",
                        account.id,
                        truncate(&account.holder_name, 24),
                        truncate(account.email.as_deref().unwrap_or("-"), 28),
                        format_amount(account.balance)
                    );
                }
            }
            print_page_footer(accounts, "accounts");
        }
    }
    Ok(())
}

fn print_transactions(transactions: &Page<Transaction>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(transactions)?),
        OutputFormat::Csv => write_csv(&transactions.content)?,
        OutputFormat::Table => {
            if transactions.is_empty() {
                println!("No transactions found.");
            } else {
                println!("{:<8} {:<20} {:>16}", "ID", "DATE", "AMOUNT");
                println!("{}", "-".repeat(46));
                for tx in &transactions.content {
                    println!(
                        "{:<8} {:<20} {:>16}",
                        tx.id,
                        tx.created_at.format("%Y-%m-%d %H:%M:%S"),
                        format_amount(tx.amount)
                    );
                }
            }
            print_page_footer(transactions, "transactions");
        }
    }
    Ok(())
}

fn print_page_footer<T>(page: &Page<T>, noun: &str) {
    println!(
        "Page {} of {} ({} {})",
        page.page + 1,
        page.total_pages.max(1),
        page.total_elements,
        noun
    );
}

fn write_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over the
/// verbosity flag.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "coffer=debug" } else { "coffer=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Map a failed command onto the process exit status.
pub fn exit_code(err: &anyhow::Error, transfer: bool) -> u8 {
    let category = match err.downcast_ref::<AppError>() {
        Some(app_err) => app_err.category(),
        // Argument parsing failures inside a command (bad amounts).
        None if err.downcast_ref::<crate::domain::ParseAmountError>().is_some() => {
            ErrorCategory::Rejected
        }
        None => ErrorCategory::Internal,
    };

    match category {
        ErrorCategory::NotFound if transfer => EXIT_REJECTED,
        ErrorCategory::NotFound => EXIT_NOT_FOUND,
        ErrorCategory::Rejected => EXIT_REJECTED,
        ErrorCategory::Internal => EXIT_INTERNAL,
    }
}

/// Print the error and flush stdout before exiting.
pub fn report_error(err: &anyhow::Error) {
    let _ = std::io::stdout().flush();
    eprintln!("Error: {:#}", err);
}
