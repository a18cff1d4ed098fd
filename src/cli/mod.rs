use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::application::{LedgerConfig, LedgerService, DEFAULT_APPROVER};
use crate::domain::{
    format_cents, parse_cents, Cents, RechargeRequest, RecordedTime, RequestStatus, TransactionView,
    WithdrawalRequest,
};
use crate::storage::{Keyspace, SqliteStore};

type Service = LedgerService<SqliteStore>;

/// Tally - local balance and request approval ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "A local key-value ledger for balances, recharges and withdrawals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tally.db")]
    pub database: String,

    /// Account key prefix
    #[arg(short, long, default_value = Keyspace::DEFAULT_PREFIX)]
    pub account: String,

    /// Balance reported for an account that has none stored yet
    #[arg(long, default_value = "1000.00")]
    pub starting_balance: String,

    /// Tag recorded on approvals and rejections
    #[arg(long, default_value = DEFAULT_APPROVER)]
    pub approver: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Show or change the balance
    Balance {
        #[command(subcommand)]
        command: Option<BalanceCommands>,
    },

    /// Show the account's user id (generated on first use)
    UserId,

    /// Recharge requests
    #[command(subcommand)]
    Recharge(RequestCommands),

    /// Withdrawal requests
    #[command(subcommand)]
    Withdraw(RequestCommands),

    /// List investment records
    Investments,

    /// Show all recharges, withdrawals and investments, newest first
    Transactions {
        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show the approval log
    Approvals,

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, approvals, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv, full is always json)
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Show the current balance
    Show,

    /// Overwrite the balance
    Set {
        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Add to the balance
    Add {
        amount: String,
    },

    /// Subtract from the balance (fails if it would go negative)
    Subtract {
        amount: String,
    },
}

#[derive(Subcommand)]
pub enum RequestCommands {
    /// Submit a new pending request
    Submit {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List pending requests
    Pending,

    /// List all requests
    List,

    /// Approve a pending request
    Approve {
        /// Request ID
        id: String,
    },

    /// Reject a pending request
    Reject {
        /// Request ID
        id: String,
    },
}

impl Cli {
    /// Install the logger. `RUST_LOG` overrides the `-v` level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .try_init();
    }

    fn config(&self) -> Result<LedgerConfig> {
        let starting_balance = parse_cents(&self.starting_balance)
            .context("Invalid starting balance. Use '1000.00' or '1000'")?;
        Ok(LedgerConfig::default()
            .with_starting_balance(starting_balance)
            .with_approver(self.approver.clone()))
    }

    async fn connect(&self, keys: Keyspace) -> Result<Service> {
        let service = LedgerService::connect(&self.database, keys)
            .await
            .with_context(|| format!("Failed to open {} (run `tally init` first)", self.database))?;
        Ok(service.with_config(self.config()?))
    }

    pub async fn run(self) -> Result<()> {
        let keys = Keyspace::new(self.account.clone());
        if matches!(self.command, Commands::Init) {
            LedgerService::init(&self.database, keys).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = self.connect(keys).await?;

        match self.command {
            Commands::Init => {}

            Commands::Balance { command } => {
                run_balance_command(&service, command.unwrap_or(BalanceCommands::Show)).await?;
            }

            Commands::UserId => {
                println!("{}", service.get_user_id().await?);
            }

            Commands::Recharge(cmd) => run_recharge_command(&service, cmd).await?,

            Commands::Withdraw(cmd) => run_withdraw_command(&service, cmd).await?,

            Commands::Investments => {
                let investments = service.list_investments().await?;
                if investments.is_empty() {
                    println!("No investments found.");
                } else {
                    println!(
                        "{:<38} {:>12} {:<10} {:<20} {:<24}",
                        "ID", "AMOUNT", "STATUS", "PROVIDER", "PAYOUT"
                    );
                    println!("{}", "-".repeat(108));
                    for inv in investments {
                        println!(
                            "{:<38} {:>12} {:<10} {:<20} {:<24}",
                            truncate(&inv.id, 38),
                            format_cents(inv.amount),
                            inv.status.as_deref().unwrap_or("-"),
                            truncate(inv.provider.as_deref().unwrap_or("-"), 20),
                            inv.payout_at
                                .as_ref()
                                .map_or_else(|| "-".to_string(), ToString::to_string)
                        );
                    }
                }
            }

            Commands::Transactions { format } => {
                run_transactions_command(&service, &format).await?;
            }

            Commands::Approvals => {
                let approvals = service.list_approvals().await?;
                if approvals.is_empty() {
                    println!("No approvals recorded.");
                } else {
                    println!(
                        "{:<20} {:<20} {:<38} {:>12}",
                        "TIMESTAMP", "TYPE", "TARGET", "AMOUNT"
                    );
                    println!("{}", "-".repeat(93));
                    for entry in approvals {
                        println!(
                            "{:<20} {:<20} {:<38} {:>12}",
                            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                            entry.kind,
                            truncate(&entry.target_id, 38),
                            format_cents(entry.amount)
                        );
                    }
                }
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                run_export_command(&service, &export_type, output.as_deref(), format.as_deref())
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_balance_command(service: &Service, cmd: BalanceCommands) -> Result<()> {
    match cmd {
        BalanceCommands::Show => {
            println!("Balance: {}", format_cents(service.get_balance().await?));
        }
        BalanceCommands::Set { amount } => {
            let amount = parse_amount(&amount)?;
            service.set_balance(amount).await?;
            println!("Balance set to {}", format_cents(amount));
        }
        BalanceCommands::Add { amount } => {
            let balance = service.add_balance(parse_amount(&amount)?).await?;
            println!("Balance: {}", format_cents(balance));
        }
        BalanceCommands::Subtract { amount } => {
            let balance = service.subtract_balance(parse_amount(&amount)?).await?;
            println!("Balance: {}", format_cents(balance));
        }
    }
    Ok(())
}

async fn run_recharge_command(service: &Service, cmd: RequestCommands) -> Result<()> {
    match cmd {
        RequestCommands::Submit { amount, note } => {
            let result = service.submit_recharge(parse_amount(&amount)?, note).await?;
            println!(
                "Submitted recharge: {} ({})",
                format_cents(result.request.amount),
                result.request.id
            );
        }
        RequestCommands::Pending => {
            print_recharges(&service.get_pending_recharges().await?, "No pending recharges.");
        }
        RequestCommands::List => {
            print_recharges(&service.list_recharges().await?, "No recharges found.");
        }
        RequestCommands::Approve { id } => {
            let result = service.approve_recharge(&id).await?;
            println!(
                "Approved recharge {}: {}",
                result.request.id,
                format_cents(result.request.amount)
            );
            if let Some(balance) = result.balance {
                println!("Balance: {}", format_cents(balance));
            }
        }
        RequestCommands::Reject { id } => {
            let result = service.reject_recharge(&id).await?;
            println!(
                "Rejected recharge {}: {}",
                result.request.id,
                format_cents(result.request.amount)
            );
        }
    }
    Ok(())
}

async fn run_withdraw_command(service: &Service, cmd: RequestCommands) -> Result<()> {
    match cmd {
        RequestCommands::Submit { amount, note } => {
            let result = service
                .submit_withdrawal(parse_amount(&amount)?, note)
                .await?;
            println!(
                "Submitted withdrawal: {} ({})",
                format_cents(result.request.amount),
                result.request.id
            );
            println!("Balance: {}", format_cents(result.balance));
        }
        RequestCommands::Pending => {
            print_withdrawals(
                &service.get_pending_withdrawals().await?,
                "No pending withdrawals.",
            );
        }
        RequestCommands::List => {
            print_withdrawals(&service.list_withdrawals().await?, "No withdrawals found.");
        }
        RequestCommands::Approve { id } => {
            let result = service.approve_withdrawal(&id).await?;
            println!(
                "Approved withdrawal {}: {}",
                result.request.id,
                format_cents(result.request.amount)
            );
        }
        RequestCommands::Reject { id } => {
            let result = service.reject_withdrawal(&id).await?;
            println!(
                "Rejected withdrawal {}: {} refunded",
                result.request.id,
                format_cents(result.request.amount)
            );
            if let Some(balance) = result.balance {
                println!("Balance: {}", format_cents(balance));
            }
        }
    }
    Ok(())
}

async fn run_transactions_command(service: &Service, format: &str) -> Result<()> {
    use crate::io::Exporter;
    use std::io::stdout;

    match format {
        "json" => {
            Exporter::new(service)
                .export_transactions_json(stdout())
                .await?;
        }
        "csv" => {
            Exporter::new(service)
                .export_transactions_csv(stdout())
                .await?;
        }
        _ => print_transactions(&service.get_all_transactions().await?),
    }
    Ok(())
}

async fn run_export_command(
    service: &Service,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

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

    let json = match format {
        None | Some("csv") => false,
        Some("json") => true,
        Some(other) => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", other),
    };

    let count = match export_type {
        "transactions" if json => exporter.export_transactions_json(writer).await?,
        "transactions" => exporter.export_transactions_csv(writer).await?,
        "approvals" if json => exporter.export_approvals_json(writer).await?,
        "approvals" => exporter.export_approvals_csv(writer).await?,
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            snapshot.transactions.len() + snapshot.approvals.len()
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, approvals, full",
                export_type
            );
        }
    };

    if output.is_some() {
        eprintln!("Exported {} {} records", count, export_type);
    }
    Ok(())
}

fn print_recharges(recharges: &[RechargeRequest], empty: &str) {
    if recharges.is_empty() {
        println!("{}", empty);
        return;
    }
    print_request_header();
    for r in recharges {
        print_request_row(&r.id, r.amount, r.status, r.created_at.as_ref(), r.note.as_deref());
    }
}

fn print_withdrawals(withdrawals: &[WithdrawalRequest], empty: &str) {
    if withdrawals.is_empty() {
        println!("{}", empty);
        return;
    }
    print_request_header();
    for w in withdrawals {
        print_request_row(&w.id, w.amount, w.status, w.created_at.as_ref(), w.note.as_deref());
    }
}

fn print_request_header() {
    println!(
        "{:<38} {:>12} {:<10} {:<24} {:<20}",
        "ID", "AMOUNT", "STATUS", "CREATED", "NOTE"
    );
    println!("{}", "-".repeat(108));
}

fn print_request_row(
    id: &str,
    amount: Cents,
    status: RequestStatus,
    created: Option<&RecordedTime>,
    note: Option<&str>,
) {
    println!(
        "{:<38} {:>12} {:<10} {:<24} {:<20}",
        truncate(id, 38),
        format_cents(amount),
        status,
        created.map_or_else(|| "-".to_string(), ToString::to_string),
        truncate(note.unwrap_or(""), 20)
    );
}

fn print_transactions(transactions: &[TransactionView]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }
    println!(
        "{:<38} {:<10} {:>12} {:<10} {:<24}",
        "ID", "TYPE", "AMOUNT", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(98));
    for tx in transactions {
        println!(
            "{:<38} {:<10} {:>12} {:<10} {:<24}",
            truncate(&tx.id, 38),
            tx.kind,
            format_cents(tx.amount),
            tx.status,
            tx.created_at
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string)
        );
    }
}

fn parse_amount(input: &str) -> Result<Cents> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
