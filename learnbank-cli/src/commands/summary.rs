//! Summary command - admin overview of the bank

use anyhow::Result;
use colored::Colorize;

use super::{get_context, print_json};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.status.summary()?;

    if json {
        return print_json(&summary);
    }

    println!("{}", "Bank Summary".bold());
    if ctx.config.demo_mode {
        output::warning("Demo mode is on");
    }
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Accounts", &summary.total_accounts.to_string()]);
    table.add_row(vec!["Pending approval", &summary.pending_approval.to_string()]);
    table.add_row(vec!["Under review", &summary.under_review.to_string()]);
    table.add_row(vec!["Approved", &summary.approved.to_string()]);
    table.add_row(vec!["Rejected", &summary.rejected.to_string()]);
    table.add_row(vec!["Ledger entries", &summary.ledger_entries.to_string()]);
    table.add_row(vec!["Total balance", &output::format_money(summary.total_balance)]);
    println!("{}", table);

    Ok(())
}
