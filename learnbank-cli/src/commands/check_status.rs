//! Check-status command - application progress by public id and serial number

use anyhow::Result;
use colored::Colorize;

use super::{get_context, print_json};
use crate::output;

pub fn run(public_id: &str, serial_number: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let report = ctx.status.check_status(public_id, serial_number)?;

    if json {
        return print_json(&report);
    }

    println!("{}", report.title.bold());
    println!("{}", report.message);
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Applicant", &report.applicant_name]);
    table.add_row(vec!["Email", &report.email]);
    table.add_row(vec![
        "Status".to_string(),
        output::status_label(report.status).to_string(),
    ]);
    table.add_row(vec!["Submitted", &output::format_time(&report.submitted_at)]);
    if let Some(estimate) = report.estimated_time {
        table.add_row(vec!["Estimated time", estimate]);
    }
    if let Some(approval) = &report.approval {
        let approved_at = approval
            .approved_at
            .as_ref()
            .map(output::format_time)
            .unwrap_or_default();
        table.add_row(vec!["Approved", &approved_at]);
        table.add_row(vec!["Approved by", &approval.approved_by]);
    }
    println!("{}", table);
    println!();
    output::info(report.next_steps);

    Ok(())
}
