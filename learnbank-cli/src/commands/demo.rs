//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use learnbank_core::services::logging::events;
use learnbank_core::services::{DemoService, LogEvent};

use super::{get_bank_dir, get_logger, log_event, print_json};
use crate::output;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode and seed the demo accounts
    #[command(name = "on")]
    On {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Disable demo mode
    #[command(name = "off")]
    Off {
        /// Also delete the demo database
        #[arg(long)]
        clean: bool,
    },
    /// Show demo mode status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let bank_dir = get_bank_dir()?;
    std::fs::create_dir_all(&bank_dir)?;
    let demo_service = DemoService::new(&bank_dir);

    match command {
        Some(DemoCommands::On { json }) => {
            let outcome = demo_service.enable()?;
            log_event(
                &get_logger(),
                LogEvent::new(events::DEMO_SEEDED).with_command("demo on"),
            );

            if json {
                return print_json(&outcome);
            }

            println!("{}", "Demo mode enabled".green());
            println!(
                "Seeded {} accounts. Log in with demo@learningbank.com / demo123, or run 'lb accounts'.",
                outcome.created.len()
            );
            Ok(())
        }
        Some(DemoCommands::Off { clean }) => {
            demo_service.disable(clean)?;
            output::warning("Demo mode disabled");
            Ok(())
        }
        Some(DemoCommands::Status { json }) => print_status(&demo_service, json),
        None => print_status(&demo_service, false),
    }
}

fn print_status(demo_service: &DemoService, json: bool) -> Result<()> {
    let enabled = demo_service.is_enabled()?;
    if json {
        return print_json(&serde_json::json!({ "demoMode": enabled }));
    }

    if enabled {
        println!("Demo mode is {}", "ON".green());
    } else {
        println!("Demo mode is {}", "OFF".yellow());
    }
    Ok(())
}
