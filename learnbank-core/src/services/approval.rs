//! Approval gate - status predicates consulted by login and transfers

use crate::domain::{Account, AccountStatus};

/// Login and transfer eligibility
///
/// Sender eligibility is enforced by authentication (only approved
/// accounts can log in), so the transfer engine only asks about the
/// recipient.
pub struct ApprovalGate;

impl ApprovalGate {
    pub fn can_login(account: &Account) -> bool {
        account.status == AccountStatus::Approved
    }

    pub fn can_receive_transfer(account: &Account) -> bool {
        account.status == AccountStatus::Approved
    }
}
