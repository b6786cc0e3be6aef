//! Approve command - admin status change for an application

use std::str::FromStr;

use anyhow::{Context, Result};
use learnbank_core::services::logging::events;
use learnbank_core::services::LogEvent;
use learnbank_core::AccountStatus;
use rust_decimal::Decimal;

use super::{get_context, get_logger, log_event, print_json};
use crate::output;

pub fn run(public_id: &str, status: &str, grant: Option<&str>, json: bool) -> Result<()> {
    let status = AccountStatus::from_str(status).map_err(anyhow::Error::msg)?;
    let grant = grant
        .map(|g| Decimal::from_str(g.trim().trim_start_matches('$')))
        .transpose()
        .context("Grant must be a number such as 1000.00")?;

    let ctx = get_context()?;
    let logger = get_logger();

    let outcome = ctx.accounts.set_approval(public_id, status, grant);
    let event = LogEvent::new(events::APPROVAL_UPDATED).with_command("approve");
    match &outcome {
        Ok(_) => log_event(&logger, event),
        Err(e) => log_event(&logger, event.with_core_error(e)),
    }
    let account = outcome?;

    if json {
        return print_json(&account);
    }

    output::success(&format!(
        "{} is now {}",
        account.public_id,
        account.status.as_str()
    ));
    if account.status == AccountStatus::Approved {
        println!("Balance: {}", output::format_money(account.balance));
    }
    Ok(())
}
