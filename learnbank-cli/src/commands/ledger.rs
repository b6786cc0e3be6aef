//! Ledger command - newest-first history for one account

use anyhow::Result;
use colored::Colorize;

use super::{get_context, print_json};
use crate::output;

pub fn run(email: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.accounts.find_by_email(email)?;
    let entries = ctx.ledger.list_for_account(account.id, limit)?;

    if json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No ledger entries for {}.", account.email);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Kind", "Amount", "Counterpart", "Description"]);

    for entry in &entries {
        let amount = output::format_money(entry.signed_amount());
        let amount = if entry.kind.is_credit() {
            amount.green().to_string()
        } else {
            amount.red().to_string()
        };

        table.add_row(vec![
            output::format_time(&entry.created_at),
            entry.kind.as_str().to_string(),
            amount,
            entry.counterpart_email.clone().unwrap_or_default(),
            entry.description.clone(),
        ]);
    }

    println!("{}", table);
    println!(
        "{} entries, balance {}",
        entries.len(),
        output::format_money(account.balance).bold()
    );
    Ok(())
}
