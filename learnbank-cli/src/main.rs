//! Learning Bank CLI - a mock bank in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    account, accounts, approve, check_status, demo, ledger, login, logs, register, summary,
    transfer,
};

/// Learning Bank - accounts, approvals and transfers
#[derive(Parser)]
#[command(name = "lb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply for a new account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Password (prompted if omitted)
        #[arg(long, env = "LEARNBANK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in and show the balance
    Login {
        email: String,
        /// Password (prompted if omitted)
        #[arg(long, env = "LEARNBANK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check an application by public ID and serial number
    CheckStatus {
        public_id: String,
        serial_number: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an application's status (admin)
    Approve {
        public_id: String,
        /// New status: approved, under_review or rejected
        #[arg(long, default_value = "approved")]
        status: String,
        /// Opening balance granted on first approval
        #[arg(long)]
        grant: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send money to another account
    Transfer {
        /// Sender email
        #[arg(long)]
        from: String,
        /// Recipient email
        #[arg(long)]
        to: String,
        /// Amount, e.g. 25.00
        amount: String,
        #[arg(long, short)]
        description: Option<String>,
        /// Sender password (prompted if omitted)
        #[arg(long, env = "LEARNBANK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one account
    Account {
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account's ledger, newest first
    Ledger {
        email: String,
        /// Maximum entries to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all accounts (admin)
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show bank totals (admin)
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LEARNBANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            json,
        } => register::run(&first_name, &last_name, &email, password, json),
        Commands::Login { email, password, json } => login::run(&email, password, json),
        Commands::CheckStatus {
            public_id,
            serial_number,
            json,
        } => check_status::run(&public_id, &serial_number, json),
        Commands::Approve {
            public_id,
            status,
            grant,
            json,
        } => approve::run(&public_id, &status, grant.as_deref(), json),
        Commands::Transfer {
            from,
            to,
            amount,
            description,
            password,
            json,
        } => transfer::run(&from, &to, &amount, description.as_deref(), password, json),
        Commands::Account { email, json } => account::run(&email, json),
        Commands::Ledger { email, limit, json } => ledger::run(&email, limit, json),
        Commands::Accounts { json } => accounts::run(json),
        Commands::Summary { json } => summary::run(json),
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
