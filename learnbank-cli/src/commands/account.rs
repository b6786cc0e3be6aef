//! Account command - show one account

use anyhow::Result;
use colored::Colorize;

use super::{get_context, print_json};
use crate::output;

pub fn run(email: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.accounts.find_by_email(email)?;

    if json {
        return print_json(&account);
    }

    println!(
        "{}",
        format!("{} {}", account.first_name, account.last_name).bold()
    );
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Email", &account.email]);
    table.add_row(vec!["Public ID", &account.public_id]);
    table.add_row(vec!["Serial Number", &account.serial_number]);
    table.add_row(vec![
        "Status".to_string(),
        output::status_label(account.status).to_string(),
    ]);
    table.add_row(vec!["Balance", &output::format_money(account.balance)]);
    table.add_row(vec!["Opened", &output::format_time(&account.created_at)]);
    if let Some(approved_at) = &account.approved_at {
        table.add_row(vec!["Approved", &output::format_time(approved_at)]);
    }
    if let Some(by) = &account.approved_by {
        table.add_row(vec!["Approved by", by]);
    }
    println!("{}", table);

    Ok(())
}
