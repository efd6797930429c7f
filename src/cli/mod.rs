use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::LedgerService;
use crate::config::LedgerConfig;
use crate::domain::{Currency, format_cents, is_supported_currency, parse_cents};

/// ebank - Minimal banking ledger
#[derive(Parser)]
#[command(name = "ebank")]
#[command(about = "A double-entry banking ledger with atomic transfers")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "EBANK_DATABASE", default_value = "ebank.db")]
    pub database: String,

    /// How long to wait for an account lock, in milliseconds
    #[arg(long, env = "EBANK_LOCK_TIMEOUT_MS", default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Deadline for a whole transfer, in milliseconds
    #[arg(long, env = "EBANK_TRANSFER_DEADLINE_MS", default_value_t = 10000)]
    pub transfer_deadline_ms: u64,

    /// Retries for a transfer that failed transiently
    #[arg(long, env = "EBANK_TRANSFER_RETRIES", default_value_t = 2)]
    pub transfer_retries: u32,

    /// Maximum pooled database connections
    #[arg(long, env = "EBANK_MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

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

    /// Transfer money between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account ID
        #[arg(long)]
        from: String,

        /// Destination account ID
        #[arg(long)]
        to: String,
    },

    /// Show detailed transfer information
    #[command(name = "show")]
    ShowTransfer {
        /// Transfer ID
        id: String,
    },

    /// List recent transfers
    Transfers {
        /// Only transfers touching this account ID
        #[arg(long)]
        account: Option<String>,

        /// Maximum number of transfers to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the entries behind an account's balance
    Statement {
        /// Account ID
        account: String,
    },

    /// Verify ledger integrity
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, statement
        export_type: String,

        /// Account ID (required for statement)
        #[arg(long)]
        account: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (statement only; default: csv)
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account owner
        owner: String,

        /// Currency code: USD, EUR, CAD
        #[arg(short, long, default_value = "USD")]
        currency: String,

        /// Opening balance (e.g., "100.00")
        #[arg(short, long, default_value = "0")]
        opening: String,
    },

    /// List accounts
    List {
        /// Only accounts of this owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show account details
    Show {
        /// Account ID
        id: String,
    },
}

impl Cli {
    /// Ledger configuration assembled from arguments and environment.
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_database_path(self.database.clone())
            .with_lock_timeout(Duration::from_millis(self.lock_timeout_ms))
            .with_transfer_deadline(Duration::from_millis(self.transfer_deadline_ms))
            .with_transfer_retries(self.transfer_retries)
            .with_max_connections(self.max_connections)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        match self.command {
            Commands::Init => {
                LedgerService::init(config).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(config).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Transfer { amount, from, to } => {
                let service = LedgerService::connect(config).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let from = parse_id(&from, "source account")?;
                let to = parse_id(&to, "destination account")?;

                let result = service.transfer(from, to, amount_cents).await?;

                println!(
                    "Transferred {} {} (#{}, {})",
                    format_cents(result.transfer.amount_cents),
                    result.from_account.currency,
                    result.transfer.sequence,
                    result.transfer.id
                );
                println!(
                    "  From {}: {}",
                    result.from_account.owner,
                    format_cents(result.from_account.balance_cents)
                );
                println!(
                    "  To {}:   {}",
                    result.to_account.owner,
                    format_cents(result.to_account.balance_cents)
                );
            }

            Commands::ShowTransfer { id } => {
                let service = LedgerService::connect(config).await?;
                let transfer_id = parse_id(&id, "transfer")?;
                run_show_transfer_command(&service, transfer_id).await?;
            }

            Commands::Transfers { account, limit } => {
                let service = LedgerService::connect(config).await?;
                let account = account
                    .map(|a| parse_id(&a, "account"))
                    .transpose()?;
                run_transfers_command(&service, account, limit).await?;
            }

            Commands::Statement { account } => {
                let service = LedgerService::connect(config).await?;
                let account_id = parse_id(&account, "account")?;
                run_statement_command(&service, account_id).await?;
            }

            Commands::Check => {
                let service = LedgerService::connect(config).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                account,
                output,
                format,
            } => {
                let service = LedgerService::connect(config).await?;
                run_export_command(
                    &service,
                    &export_type,
                    account.as_deref(),
                    output.as_deref(),
                    format.as_deref(),
                )
                .await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            owner,
            currency,
            opening,
        } => {
            let currency = currency.to_uppercase();
            if !is_supported_currency(&currency) {
                let valid: Vec<&str> = Currency::ALL.iter().map(|c| c.as_str()).collect();
                anyhow::bail!(
                    "Unsupported currency '{}'. Valid currencies: {}",
                    currency,
                    valid.join(", ")
                );
            }
            let opening_cents = parse_cents(&opening)
                .context("Invalid opening balance. Use '100.00' or '100'")?;
            let account = service
                .create_account(&owner, &currency, opening_cents)
                .await?;
            println!(
                "Created account {} for {} ({} {})",
                account.id,
                account.owner,
                format_cents(account.balance_cents),
                account.currency
            );
        }

        AccountCommands::List { owner } => {
            let accounts = service.list_accounts(owner.as_deref()).await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<36}  {:<20} {:<8} {:>14}",
                    "ID", "OWNER", "CURRENCY", "BALANCE"
                );
                println!("{}", "-".repeat(82));
                for account in accounts {
                    println!(
                        "{:<36}  {:<20} {:<8} {:>14}",
                        account.id,
                        truncate(&account.owner, 20),
                        account.currency,
                        format_cents(account.balance_cents)
                    );
                }
            }
        }

        AccountCommands::Show { id } => {
            let account_id = parse_id(&id, "account")?;
            let account = service.get_account(account_id).await?;

            println!("Account: {}", account.id);
            println!("  Owner:    {}", account.owner);
            println!("  Currency: {}", account.currency);
            println!(
                "  Balance:  {} {}",
                format_cents(account.balance_cents),
                account.currency
            );
            println!(
                "  Created:  {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    Ok(())
}

async fn run_show_transfer_command(service: &LedgerService, transfer_id: Uuid) -> Result<()> {
    let info = service.get_transfer_info(transfer_id).await?;
    let transfer = &info.transfer;

    println!("Transfer: {}", transfer.id);
    println!("  Sequence:    {}", transfer.sequence);
    println!(
        "  Date:        {}",
        transfer.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Amount:      {}", format_cents(transfer.amount_cents));
    println!("  From:        {}", transfer.from_account);
    println!("  To:          {}", transfer.to_account);
    println!();
    println!("  Entries:");
    for entry in &info.entries {
        println!(
            "    {:>12}  {}",
            format_cents(entry.amount_cents),
            entry.account_id
        );
    }

    Ok(())
}

async fn run_transfers_command(
    service: &LedgerService,
    account: Option<Uuid>,
    limit: Option<usize>,
) -> Result<()> {
    let transfers = service.list_transfers(account, limit).await?;

    if transfers.is_empty() {
        println!("No transfers found.");
    } else {
        println!(
            "{:>6}  {:<19} {:>12}  {:<36}  {:<36}",
            "SEQ", "DATE", "AMOUNT", "FROM", "TO"
        );
        println!("{}", "-".repeat(115));
        for transfer in &transfers {
            // Signed from the filtered account's point of view
            let amount = match account {
                Some(id) => transfer.net_effect(id),
                None => transfer.amount_cents,
            };
            println!(
                "{:>6}  {:<19} {:>12}  {:<36}  {:<36}",
                transfer.sequence,
                transfer.created_at.format("%Y-%m-%d %H:%M:%S"),
                format_cents(amount),
                transfer.from_account,
                transfer.to_account
            );
        }
    }
    Ok(())
}

async fn run_statement_command(service: &LedgerService, account_id: Uuid) -> Result<()> {
    let statement = service.statement(account_id).await?;
    let account = &statement.account;

    println!(
        "Statement for {} ({}, {})",
        account.owner, account.id, account.currency
    );
    println!();
    println!(
        "{:<19} {:>12} {:>14}  TRANSFER",
        "DATE", "AMOUNT", "BALANCE"
    );
    println!("{}", "-".repeat(84));

    let mut running = 0;
    for entry in &statement.entries {
        running += entry.amount_cents;
        let source = match entry.transfer_id {
            Some(id) if entry.is_debit() => format!("to {}", id),
            Some(id) => format!("from {}", id),
            None => "opening balance".to_string(),
        };
        println!(
            "{:<19} {:>12} {:>14}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            format_cents(entry.amount_cents),
            format_cents(running),
            source
        );
    }

    println!("{}", "-".repeat(84));
    println!(
        "{:<19} {:>12} {:>14}  {}",
        "Balance:",
        "",
        format_cents(account.balance_cents),
        if statement.is_consistent() {
            "OK"
        } else {
            "MISMATCH!"
        }
    );

    if !statement.is_consistent() {
        anyhow::bail!(
            "Stored balance {} does not match entry total {}",
            format_cents(account.balance_cents),
            format_cents(statement.entry_total)
        );
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Accounts:  {}", report.account_count);
    println!("Transfers: {}", report.transfer_count);
    println!("Entries:   {}", report.entry_count);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    account: Option<&str>,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "accounts" => {
            let count = exporter.export_accounts_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} accounts", count);
            }
        }
        "statement" => {
            let account = account
                .ok_or_else(|| anyhow::anyhow!("--account is required for a statement export"))?;
            let account_id = parse_id(account, "account")?;

            match format.unwrap_or("csv") {
                "csv" => {
                    let count = exporter.export_statement_csv(account_id, writer).await?;
                    if output.is_some() {
                        eprintln!("Exported {} entries", count);
                    }
                }
                "json" => {
                    let snapshot = exporter.export_statement_json(account_id, writer).await?;
                    if output.is_some() {
                        eprintln!(
                            "Exported statement: {} entries",
                            snapshot.statement.entries.len()
                        );
                    }
                }
                other => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", other),
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: accounts, statement",
                export_type
            );
        }
    }

    Ok(())
}

fn parse_id(id: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(id).with_context(|| format!("Invalid {} ID format (expected UUID)", what))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
