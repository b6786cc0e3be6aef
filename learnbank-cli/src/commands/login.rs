//! Login command - check credentials and show the account

use anyhow::Result;
use learnbank_core::services::logging::events;

use super::{get_context, get_logger, log_outcome, password_or_prompt, print_json};
use crate::output;

pub fn run(email: &str, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let password = password_or_prompt(password, "Password")?;
    let logger = get_logger();

    let outcome = ctx.auth.login(email, &password);
    log_outcome(&logger, "login", events::LOGIN_SUCCEEDED, events::LOGIN_FAILED, &outcome);
    let account = outcome?;

    if json {
        return print_json(&account);
    }

    output::success(&format!("Welcome back, {}", account.first_name));
    println!("Balance: {}", output::format_money(account.balance));
    Ok(())
}
