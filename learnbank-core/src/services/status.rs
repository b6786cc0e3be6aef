//! Status service - unauthenticated application status and the admin summary

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::AccountStatus;
use crate::ports::Repository;

/// Attribution shown when an approval carries none
pub const DEFAULT_APPROVER: &str = "Federal Banking Team";

/// Status service for applicants and administrators
pub struct StatusService<R: Repository> {
    repository: Arc<R>,
}

impl<R: Repository> StatusService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Look up an application by its external identifier pair
    ///
    /// Needs no password, so the report carries no balance.
    pub fn check_status(&self, public_id: &str, serial_number: &str) -> Result<StatusReport> {
        let account = self
            .repository
            .find_by_external_id(public_id.trim(), serial_number.trim())?
            .ok_or_else(|| {
                Error::not_found("No account found with the provided User ID and Serial Number")
            })?;

        let info = StatusInfo::for_status(account.status);
        let approval = (account.status == AccountStatus::Approved).then(|| ApprovalDetails {
            approved_at: account.approved_at,
            approved_by: account
                .approved_by
                .clone()
                .unwrap_or_else(|| DEFAULT_APPROVER.to_string()),
        });

        Ok(StatusReport {
            public_id: account.public_id.clone(),
            serial_number: account.serial_number.clone(),
            applicant_name: account.full_name(),
            email: account.email.clone(),
            status: account.status,
            submitted_at: account.created_at,
            title: info.title,
            message: info.message,
            estimated_time: info.estimated_time,
            next_steps: info.next_steps,
            approval,
        })
    }

    /// Account counts per status, ledger size and total money in the bank
    pub fn summary(&self) -> Result<BankSummary> {
        let accounts = self.repository.list_accounts()?;
        let mut summary = BankSummary {
            total_accounts: accounts.len(),
            pending_approval: 0,
            under_review: 0,
            approved: 0,
            rejected: 0,
            ledger_entries: self.repository.ledger_count()?,
            total_balance: Decimal::ZERO,
        };

        for account in &accounts {
            match account.status {
                AccountStatus::PendingApproval => summary.pending_approval += 1,
                AccountStatus::UnderReview => summary.under_review += 1,
                AccountStatus::Approved => summary.approved += 1,
                AccountStatus::Rejected => summary.rejected += 1,
            }
            summary.total_balance += account.balance;
        }

        Ok(summary)
    }
}

struct StatusInfo {
    title: &'static str,
    message: &'static str,
    estimated_time: Option<&'static str>,
    next_steps: &'static str,
}

impl StatusInfo {
    fn for_status(status: AccountStatus) -> Self {
        match status {
            AccountStatus::PendingApproval => Self {
                title: "Account Pending Approval",
                message: "Your account is currently under review by our Federal Banking Team.",
                estimated_time: Some("24-48 hours from submission"),
                next_steps: "Please check back later. You will be notified once approved.",
            },
            AccountStatus::UnderReview => Self {
                title: "Account Under Review",
                message: "Your account is being actively reviewed by our compliance team.",
                estimated_time: Some("12-24 hours"),
                next_steps: "Final verification in progress. Please check back soon.",
            },
            AccountStatus::Approved => Self {
                title: "Account Approved",
                message: "Congratulations! Your Learning Bank account has been approved.",
                estimated_time: Some("Ready now"),
                next_steps: "You can now log in to access your banking services.",
            },
            AccountStatus::Rejected => Self {
                title: "Account Application Rejected",
                message: "Unfortunately, your account application could not be approved at this time.",
                estimated_time: None,
                next_steps: "Please contact our support team for more information.",
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDetails {
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: String,
}

/// Application status as shown to an unauthenticated applicant
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub public_id: String,
    pub serial_number: String,
    pub applicant_name: String,
    pub email: String,
    pub status: AccountStatus,
    pub submitted_at: DateTime<Utc>,
    pub title: &'static str,
    pub message: &'static str,
    pub estimated_time: Option<&'static str>,
    pub next_steps: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalDetails>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSummary {
    pub total_accounts: usize,
    pub pending_approval: usize,
    pub under_review: usize,
    pub approved: usize,
    pub rejected: usize,
    pub ledger_entries: u64,
    pub total_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRepository;
    use crate::domain::Account;

    fn insert(repo: &MemoryRepository, email: &str, public_id: &str, status: AccountStatus, cents: i64) -> Account {
        let mut account = Account::new("Jane", "Doe", email, "hash", public_id, format!("LB{}", public_id));
        account.status = status;
        account.balance = Decimal::new(cents, 2);
        repo.insert_account(&account).unwrap();
        account
    }

    #[test]
    fn test_check_status_pending() {
        let repo = Arc::new(MemoryRepository::new());
        insert(&repo, "a@test.com", "USA1", AccountStatus::PendingApproval, 0);
        let service = StatusService::new(repo);

        let report = service.check_status("USA1", "LBUSA1").unwrap();
        assert_eq!(report.status, AccountStatus::PendingApproval);
        assert_eq!(report.applicant_name, "Jane Doe");
        assert_eq!(report.title, "Account Pending Approval");
        assert!(report.approval.is_none());
    }

    #[test]
    fn test_check_status_approved_default_attribution() {
        let repo = Arc::new(MemoryRepository::new());
        insert(&repo, "a@test.com", "USA1", AccountStatus::Approved, 0);
        let service = StatusService::new(repo);

        let report = service.check_status("USA1", "LBUSA1").unwrap();
        let approval = report.approval.unwrap();
        assert_eq!(approval.approved_by, DEFAULT_APPROVER);
    }

    #[test]
    fn test_check_status_wrong_serial() {
        let repo = Arc::new(MemoryRepository::new());
        insert(&repo, "a@test.com", "USA1", AccountStatus::Approved, 0);
        let service = StatusService::new(repo);

        assert!(matches!(
            service.check_status("USA1", "LBWRONG"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_summary_counts_and_total() {
        let repo = Arc::new(MemoryRepository::new());
        insert(&repo, "a@test.com", "USA1", AccountStatus::Approved, 100000);
        insert(&repo, "b@test.com", "USA2", AccountStatus::Approved, 50050);
        insert(&repo, "c@test.com", "USA3", AccountStatus::Rejected, 0);
        insert(&repo, "d@test.com", "USA4", AccountStatus::PendingApproval, 0);
        let service = StatusService::new(repo);

        let summary = service.summary().unwrap();
        assert_eq!(summary.total_accounts, 4);
        assert_eq!(summary.approved, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.pending_approval, 1);
        assert_eq!(summary.under_review, 0);
        assert_eq!(summary.total_balance, Decimal::new(150050, 2));
        assert_eq!(summary.ledger_entries, 0);
    }
}
