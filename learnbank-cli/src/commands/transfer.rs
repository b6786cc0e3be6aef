//! Transfer command - move money to another approved account
//!
//! The sender proves who they are with email and password first; the
//! transfer then runs against the returned account id.

use anyhow::Result;
use learnbank_core::domain::money::parse_amount;
use learnbank_core::services::logging::events;
use learnbank_core::services::LogEvent;

use super::{get_context, get_logger, log_event, log_outcome, password_or_prompt, print_json};
use crate::output;

pub fn run(
    from: &str,
    to: &str,
    amount: &str,
    description: Option<&str>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let amount = match parse_amount(amount) {
        Ok(a) => a,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new(events::TRANSFER_FAILED)
                    .with_command("transfer")
                    .with_core_error(&e),
            );
            return Err(e.into());
        }
    };

    let password = password_or_prompt(password, "Password")?;
    let login = ctx.auth.login(from, &password);
    log_outcome(&logger, "transfer", events::LOGIN_SUCCEEDED, events::LOGIN_FAILED, &login);
    let sender = login?;

    let outcome = ctx.transfers.transfer(sender.id, to, amount, description);
    log_outcome(
        &logger,
        "transfer",
        events::TRANSFER_COMPLETED,
        events::TRANSFER_FAILED,
        &outcome,
    );
    let receipt = outcome?;

    if json {
        return print_json(&receipt);
    }

    output::success(&format!(
        "Sent {} to {}",
        output::format_money(receipt.amount),
        receipt.recipient_email
    ));
    println!("Description: {}", receipt.description);
    println!("New balance: {}", output::format_money(receipt.new_sender_balance));
    Ok(())
}
