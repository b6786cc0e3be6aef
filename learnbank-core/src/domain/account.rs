//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Approval status of an account
///
/// Governs login and transfer eligibility. New accounts start as
/// `PendingApproval` and are moved by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    PendingApproval,
    UnderReview,
    Approved,
    Rejected,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::PendingApproval => "pending_approval",
            AccountStatus::UnderReview => "under_review",
            AccountStatus::Approved => "approved",
            AccountStatus::Rejected => "rejected",
        }
    }

    /// Statuses an administrator may move an account into
    pub fn is_admin_target(&self) -> bool {
        !matches!(self, AccountStatus::PendingApproval)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending_approval" | "pending" => Ok(AccountStatus::PendingApproval),
            "under_review" | "review" => Ok(AccountStatus::UnderReview),
            "approved" => Ok(AccountStatus::Approved),
            "rejected" => Ok(AccountStatus::Rejected),
            other => Err(format!("unknown account status '{}'", other)),
        }
    }
}

/// A bank account: identity, credential hash, approval status and balance
///
/// Deliberately not `Serialize`: the credential hash must never leave the
/// core. Use [`Account::snapshot`] for anything shown to a caller.
#[derive(Clone, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Login handle and transfer recipient key, stored lower-cased
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Public half of the external identifier pair
    pub public_id: String,
    /// Secret half of the external identifier pair
    pub serial_number: String,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

impl Account {
    /// Create a freshly registered account (pending approval, zero balance)
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: &str,
        password_hash: impl Into<String>,
        public_id: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: Self::normalize_email(email),
            password_hash: password_hash.into(),
            public_id: public_id.into(),
            serial_number: serial_number.into(),
            balance: Decimal::ZERO,
            status: AccountStatus::PendingApproval,
            created_at: Utc::now(),
            approved_at: None,
            approved_by: None,
        }
    }

    /// Normalize an email to its stored form
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("first and last name are required");
        }
        if self.email.is_empty() {
            return Err("email is required");
        }
        if self.password_hash.is_empty() {
            return Err("credential hash is required");
        }
        if self.balance < Decimal::ZERO {
            return Err("balance cannot be negative");
        }
        Ok(())
    }

    /// Caller-safe view of this account (no credential)
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            public_id: self.public_id.clone(),
            serial_number: self.serial_number.clone(),
            balance: self.balance,
            status: self.status,
            created_at: self.created_at,
            approved_at: self.approved_at,
            approved_by: self.approved_by.clone(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("public_id", &self.public_id)
            .field("balance", &self.balance)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Account as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub public_id: String,
    pub serial_number: String,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

const BASE36_DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Generate a public ID: `USA` + last 6 timestamp digits + 3 random digits
pub fn generate_public_id(now_ms: u64, rng: &mut impl Rng) -> String {
    format!("USA{:06}{:03}", now_ms % 1_000_000, rng.gen_range(0..1000))
}

/// Generate a serial number: `LB` + base-36 timestamp + 4 random base-36 chars
pub fn generate_serial_number(now_ms: u64, rng: &mut impl Rng) -> String {
    let suffix: String = (0..4)
        .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
        .collect();
    format!("LB{}{}", to_base36(now_ms), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Account {
        Account::new("Ada", "Lovelace", "  Ada@Example.COM ", "$argon2id$hash", "USA123456789", "LBABC")
    }

    #[test]
    fn test_new_account_defaults() {
        let account = sample();
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.status, AccountStatus::PendingApproval);
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(account.approved_at.is_none());
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_account_validation() {
        let mut account = sample();
        account.first_name = " ".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_snapshot_and_debug_hide_credential() {
        let account = sample();
        let json = serde_json::to_string(&account.snapshot()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!format!("{:?}", account).contains("argon2"));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AccountStatus::PendingApproval,
            AccountStatus::UnderReview,
            AccountStatus::Approved,
            AccountStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert!("frozen".parse::<AccountStatus>().is_err());
        assert!(!AccountStatus::PendingApproval.is_admin_target());
    }

    #[test]
    fn test_external_id_shapes() {
        let mut rng = rand::thread_rng();
        let public_id = generate_public_id(1_700_000_123_456, &mut rng);
        assert!(public_id.starts_with("USA123456"));
        assert_eq!(public_id.len(), 12);

        let serial = generate_serial_number(1_700_000_123_456, &mut rng);
        assert!(serial.starts_with("LB"));
        assert!(serial[2..].chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }
}
