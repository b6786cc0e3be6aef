//! CLI command implementations

pub mod account;
pub mod accounts;
pub mod approve;
pub mod check_status;
pub mod demo;
pub mod ledger;
pub mod login;
pub mod logs;
pub mod register;
pub mod summary;
pub mod transfer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Password;
use learnbank_core::adapters::duckdb::DuckDbRepository;
use learnbank_core::services::{EntryPoint, LogEvent, LoggingService};
use learnbank_core::{BankContext, Error};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let bank_dir = get_bank_dir().ok()?;
    std::fs::create_dir_all(&bank_dir).ok()?;
    LoggingService::new(&bank_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Log the outcome of a core operation under `ok_event` / `failed_event`
pub fn log_outcome<T>(
    logger: &Option<LoggingService>,
    command: &str,
    ok_event: &str,
    failed_event: &str,
    outcome: &std::result::Result<T, Error>,
) {
    let event = match outcome {
        Ok(_) => LogEvent::new(ok_event).with_command(command),
        Err(e) => LogEvent::new(failed_event)
            .with_command(command)
            .with_core_error(e),
    };
    log_event(logger, event);
}

/// Get the bank directory from environment or default
pub fn get_bank_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEARNBANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".learnbank"))
}

/// Open the bank for the current mode
pub fn get_context() -> Result<BankContext<DuckDbRepository>> {
    let bank_dir = get_bank_dir()?;
    tracing::debug!(bank_dir = %bank_dir.display(), "opening bank");
    BankContext::open(&bank_dir).context("Failed to open the bank")
}

/// Use the supplied password or prompt for one
pub fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => Ok(Password::new().with_prompt(prompt).interact()?),
    }
}

/// Prompt for a new password twice
pub fn new_password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }

    let p1 = Password::new().with_prompt("Choose a password").interact()?;
    let p2 = Password::new().with_prompt("Confirm password").interact()?;

    if p1 != p2 {
        anyhow::bail!("Passwords do not match");
    }
    Ok(p1)
}

/// Print a JSON value
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
