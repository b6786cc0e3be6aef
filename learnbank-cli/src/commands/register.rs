//! Register command - open a new account application

use anyhow::Result;
use colored::Colorize;
use learnbank_core::services::logging::events;
use learnbank_core::services::LogEvent;

use super::{get_context, get_logger, log_event, new_password_or_prompt, print_json};
use crate::output;

pub fn run(
    first_name: &str,
    last_name: &str,
    email: &str,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let password = new_password_or_prompt(password)?;
    let logger = get_logger();

    let registration = ctx
        .accounts
        .register(first_name, last_name, email, &password)?;
    log_event(
        &logger,
        LogEvent::new(events::ACCOUNT_REGISTERED).with_command("register"),
    );

    if json {
        return print_json(&registration);
    }

    output::success("Application submitted");
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Public ID", &registration.public_id]);
    table.add_row(vec!["Serial Number", &registration.serial_number]);
    table.add_row(vec!["Email", &registration.email]);
    table.add_row(vec![
        "Status".to_string(),
        output::status_label(registration.status).to_string(),
    ]);
    println!("{}", table);
    println!();
    println!(
        "Keep your public ID and serial number. Check progress with {}",
        format!(
            "lb check-status {} {}",
            registration.public_id, registration.serial_number
        )
        .bold()
    );

    Ok(())
}
