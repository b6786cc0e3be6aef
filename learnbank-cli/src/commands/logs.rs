//! Logs command - view and manage the event log

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use learnbank_core::services::logging::now_ms;
use learnbank_core::services::{EntryPoint, LoggingService};

use super::{get_bank_dir, print_json};
use crate::output;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Recent events, newest first
    List {
        /// Maximum events to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove old events
    Clear {
        /// Age cutoff in days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Do not ask for confirmation
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Event count, failure count and log file location
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy the log database to a file
    Export {
        /// Destination path
        output: PathBuf,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let bank_dir = get_bank_dir()?;
    std::fs::create_dir_all(&bank_dir)?;
    LoggingService::new(&bank_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn event_time(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|dt| output::format_time(&dt))
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                return print_json(&entries);
            }

            if entries.is_empty() {
                println!("The event log is empty.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Command", "Error"]);

            for entry in &entries {
                let error = match (&entry.error_kind, &entry.error_message) {
                    (Some(kind), _) => kind.red().to_string(),
                    (None, Some(message)) => message.red().to_string(),
                    (None, None) => String::new(),
                };

                table.add_row(vec![
                    event_time(entry.timestamp),
                    entry.entry_point.clone(),
                    entry.event.clone(),
                    entry.command.clone().unwrap_or_default(),
                    error,
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let cutoff_ms = now_ms() - older_than_days as i64 * DAY_MS;

            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete logs older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                print_json(&serde_json::json!({ "deleted": deleted }))?;
            } else {
                println!("Removed {} events older than {} days", deleted, older_than_days);
            }
        }
        LogsCommands::Stats { json } => {
            let total = service.count()?;
            let errors = service.get_errors(1000)?.len();
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                print_json(&serde_json::json!({
                    "totalEntries": total,
                    "errorCount": errors,
                    "databasePath": db_path.to_string_lossy(),
                    "databaseSizeBytes": size_bytes
                }))?;
            } else {
                println!("{}", "Event log".bold());
                let mut table = output::create_table();
                table.add_row(vec!["Events", &total.to_string()]);
                table.add_row(vec!["Failures", &errors.to_string()]);
                table.add_row(vec!["File", &db_path.display().to_string()]);
                table.add_row(vec!["Size", &format!("{} KiB", size_bytes.div_ceil(1024))]);
                println!("{}", table);
            }
        }
        LogsCommands::Export { output: path } => {
            let written = service.export(&path)?;
            output::success(&format!("Logs exported to {}", written.display()));
        }
    }

    Ok(())
}
