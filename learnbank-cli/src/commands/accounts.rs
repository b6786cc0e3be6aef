//! Accounts command - list every account

use anyhow::Result;

use super::{get_context, print_json};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let accounts = ctx.accounts.list_accounts()?;

    if json {
        return print_json(&accounts);
    }

    if accounts.is_empty() {
        println!("No accounts yet. Try 'lb register' or 'lb demo on'.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Email", "Public ID", "Status", "Balance"]);
    for account in &accounts {
        table.add_row(vec![
            format!("{} {}", account.first_name, account.last_name),
            account.email.clone(),
            account.public_id.clone(),
            output::status_label(account.status).to_string(),
            output::format_money(account.balance),
        ]);
    }
    println!("{}", table);

    Ok(())
}
