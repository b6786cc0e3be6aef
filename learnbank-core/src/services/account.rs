//! Account store - registration, lookups and admin approval

use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::money::validate_grant;
use crate::domain::result::{Error, Result};
use crate::domain::{
    generate_public_id, generate_serial_number, Account, AccountSnapshot, AccountStatus,
    EntryKind, LedgerEntry,
};
use crate::ports::{Repository, UnitOfWork};
use crate::services::credential::CredentialHasher;

/// Attempts at generating an unused external identifier pair
const MAX_ID_ATTEMPTS: usize = 5;

pub const GRANT_DESCRIPTION: &str = "Opening balance grant";
pub const REGRANT_DESCRIPTION: &str = "Balance set by approval";

/// `local@domain.tld`, no whitespace
fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub account_id: Uuid,
    pub public_id: String,
    pub serial_number: String,
    pub email: String,
    pub status: AccountStatus,
}

/// Account store operations
pub struct AccountService<R: Repository> {
    repository: Arc<R>,
    hasher: CredentialHasher,
    min_password_length: usize,
    starting_balance: Decimal,
    approved_by: String,
}

impl<R: Repository> AccountService<R> {
    pub fn new(repository: Arc<R>, config: &Config) -> Self {
        Self {
            repository,
            hasher: CredentialHasher::new(config.argon2.clone()),
            min_password_length: config.min_password_length,
            starting_balance: config.starting_balance,
            approved_by: config.approved_by.clone(),
        }
    }

    /// Register a new applicant: validate, hash the password, create the account
    pub fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration> {
        if password.chars().count() < self.min_password_length {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        if password.trim().is_empty() {
            return Err(Error::validation("All fields are required"));
        }

        let password_hash = self.hasher.hash(password)?;
        let account = self.create_account(first_name, last_name, email, &password_hash)?;

        tracing::info!(account_id = %account.id, "account registered");

        Ok(Registration {
            account_id: account.id,
            public_id: account.public_id,
            serial_number: account.serial_number,
            email: account.email,
            status: account.status,
        })
    }

    /// Create an account from an already-hashed credential
    ///
    /// The account starts as `pending_approval` with a zero balance. A fresh
    /// external identifier pair is generated; collisions are retried.
    pub fn create_account(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountSnapshot> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        let email = Account::normalize_email(email);

        if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
            return Err(Error::validation("All fields are required"));
        }
        if !is_valid_email(&email) {
            return Err(Error::validation(format!("'{}' is not a valid email address", email)));
        }
        if self.repository.find_by_email(&email)?.is_some() {
            return Err(Error::DuplicateEmail(email));
        }

        let mut rng = rand::thread_rng();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let now = now_ms();
            let account = Account::new(
                first_name,
                last_name,
                &email,
                password_hash,
                generate_public_id(now, &mut rng),
                generate_serial_number(now, &mut rng),
            );
            account.validate().map_err(Error::validation)?;

            match self.repository.insert_account(&account) {
                Ok(()) => return Ok(account.snapshot()),
                Err(Error::DuplicateExternalId(id)) => {
                    tracing::debug!(attempt, "external id {} already taken, regenerating", id);
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::storage(format!(
            "could not allocate a unique external identifier after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    pub fn find_by_email(&self, email: &str) -> Result<AccountSnapshot> {
        self.repository
            .find_by_email(email)?
            .map(|a| a.snapshot())
            .ok_or_else(|| Error::not_found(format!("no account for {}", email.trim())))
    }

    pub fn find_by_external_id(&self, public_id: &str, serial_number: &str) -> Result<AccountSnapshot> {
        self.repository
            .find_by_external_id(public_id.trim(), serial_number.trim())?
            .map(|a| a.snapshot())
            .ok_or_else(|| {
                Error::not_found("No account found with the provided User ID and Serial Number")
            })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<AccountSnapshot> {
        self.repository
            .find_account(id)?
            .map(|a| a.snapshot())
            .ok_or_else(|| Error::not_found(format!("account {}", id)))
    }

    /// Move an account to `approved`, `rejected` or `under_review`
    ///
    /// Every approval sets the balance to the grant (the configured default
    /// when none is given) and stamps `approved_at`/`approved_by`. The change
    /// is written to the ledger in the same unit of work: a `deposit` when the
    /// balance goes up, a `correction` when it goes down, nothing when equal.
    pub fn set_approval(
        &self,
        public_id: &str,
        status: AccountStatus,
        starting_balance: Option<Decimal>,
    ) -> Result<AccountSnapshot> {
        if !status.is_admin_target() {
            return Err(Error::validation(
                "Invalid status. Must be: approved, rejected, or under_review",
            ));
        }
        let grant = validate_grant(starting_balance.unwrap_or(self.starting_balance))?;

        let id = self
            .repository
            .find_by_public_id(public_id.trim())?
            .map(|a| a.id)
            .ok_or_else(|| Error::not_found(format!("no account with public id {}", public_id.trim())))?;

        let updated = self.repository.atomically(&[id], |unit| {
            let mut account = unit
                .account(id)?
                .ok_or_else(|| Error::not_found(format!("account {}", id)))?;

            account.status = status;

            if status == AccountStatus::Approved {
                let now = Utc::now();
                account.approved_at = Some(now);
                account.approved_by = Some(self.approved_by.clone());

                let adjustment = match grant.cmp(&account.balance) {
                    Ordering::Greater => Some((EntryKind::Deposit, grant - account.balance)),
                    Ordering::Less => Some((EntryKind::Correction, account.balance - grant)),
                    Ordering::Equal => None,
                };
                if let Some((kind, amount)) = adjustment {
                    let description = if account.balance.is_zero() {
                        GRANT_DESCRIPTION
                    } else {
                        REGRANT_DESCRIPTION
                    };
                    unit.append_entry(&LedgerEntry::new(
                        account.id,
                        kind,
                        amount,
                        description,
                        None,
                        now,
                    ))?;
                }
                account.balance = grant;
            }

            unit.write_account(&account)?;
            Ok(account)
        })?;

        tracing::info!(account_id = %updated.id, status = %updated.status, "approval updated");
        Ok(updated.snapshot())
    }

    /// All accounts, oldest first
    pub fn list_accounts(&self) -> Result<Vec<AccountSnapshot>> {
        Ok(self
            .repository
            .list_accounts()?
            .iter()
            .map(Account::snapshot)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRepository;
    use crate::domain::Argon2Params;

    fn service() -> AccountService<MemoryRepository> {
        let config = Config {
            argon2: Argon2Params::minimal(),
            ..Config::default()
        };
        AccountService::new(Arc::new(MemoryRepository::new()), &config)
    }

    #[test]
    fn test_register_creates_pending_account() {
        let service = service();
        let reg = service
            .register("Alice", "Johnson", "Alice@Test.com", "test123")
            .unwrap();

        assert_eq!(reg.status, AccountStatus::PendingApproval);
        assert_eq!(reg.email, "alice@test.com");
        assert!(reg.public_id.starts_with("USA"));
        assert!(reg.serial_number.starts_with("LB"));

        let account = service.find_by_email("alice@test.com").unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(account.approved_at.is_none());
    }

    #[test]
    fn test_register_validation() {
        let service = service();
        assert!(matches!(
            service.register("A", "B", "a@test.com", "short"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.register("A", "B", "not-an-email", "longenough"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.register(" ", "B", "a@test.com", "longenough"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_email_is_case_insensitive() {
        let service = service();
        service.register("A", "B", "a@test.com", "secret1").unwrap();
        let err = service.register("C", "D", "A@TEST.COM", "secret2").unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(_)));
    }

    #[test]
    fn test_find_by_external_id_requires_both_halves() {
        let service = service();
        let reg = service.register("A", "B", "a@test.com", "secret1").unwrap();

        assert!(service.find_by_external_id(&reg.public_id, &reg.serial_number).is_ok());
        assert!(matches!(
            service.find_by_external_id(&reg.public_id, "LBWRONG"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_first_approval_grants_starting_balance() {
        let service = service();
        let reg = service.register("A", "B", "a@test.com", "secret1").unwrap();

        let approved = service
            .set_approval(&reg.public_id, AccountStatus::Approved, None)
            .unwrap();
        assert_eq!(approved.status, AccountStatus::Approved);
        assert_eq!(approved.balance, Decimal::new(100000, 2));
        assert_eq!(approved.approved_by.as_deref(), Some("Admin"));
        assert!(approved.approved_at.is_some());

        let entries = service.repository.ledger_for_account(approved.id, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Deposit);
        assert_eq!(entries[0].amount, Decimal::new(100000, 2));
    }

    #[test]
    fn test_every_approval_sets_the_grant() {
        let service = service();
        let reg = service.register("A", "B", "a@test.com", "secret1").unwrap();
        service
            .set_approval(&reg.public_id, AccountStatus::Approved, Some(Decimal::new(50, 0)))
            .unwrap();

        // Already approved: the new grant replaces the balance
        let raised = service
            .set_approval(&reg.public_id, AccountStatus::Approved, Some(Decimal::new(2000, 0)))
            .unwrap();
        assert_eq!(raised.balance, Decimal::new(2000, 0));
        assert_eq!(raised.status, AccountStatus::Approved);

        service
            .set_approval(&reg.public_id, AccountStatus::Rejected, None)
            .unwrap();
        let lowered = service
            .set_approval(&reg.public_id, AccountStatus::Approved, Some(Decimal::new(20, 0)))
            .unwrap();
        assert_eq!(lowered.balance, Decimal::new(20, 0));
        assert_eq!(lowered.approved_by.as_deref(), Some("Admin"));

        // Same grant again: nothing to record
        service
            .set_approval(&reg.public_id, AccountStatus::Approved, Some(Decimal::new(20, 0)))
            .unwrap();

        let entries = service.repository.ledger_for_account(reg.account_id, 10).unwrap();
        let kinds: Vec<EntryKind> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EntryKind::Correction, EntryKind::Deposit, EntryKind::Deposit]
        );
        assert_eq!(entries[0].amount, Decimal::new(1980, 0));
        assert_eq!(entries[1].amount, Decimal::new(1950, 0));
        assert_eq!(entries[1].description, REGRANT_DESCRIPTION);
        assert_eq!(entries[2].description, GRANT_DESCRIPTION);

        let net: Decimal = entries.iter().map(|e| e.signed_amount()).sum();
        assert_eq!(net, lowered.balance);
    }

    #[test]
    fn test_approval_after_review_uses_default_grant() {
        let service = service();
        let reg = service.register("A", "B", "a@test.com", "secret1").unwrap();
        service
            .set_approval(&reg.public_id, AccountStatus::UnderReview, None)
            .unwrap();

        let approved = service
            .set_approval(&reg.public_id, AccountStatus::Approved, None)
            .unwrap();
        assert_eq!(approved.balance, Decimal::new(100000, 2));
        assert!(approved.approved_at.is_some());
    }

    #[test]
    fn test_set_approval_rejects_bad_input() {
        let service = service();
        let reg = service.register("A", "B", "a@test.com", "secret1").unwrap();

        assert!(matches!(
            service.set_approval(&reg.public_id, AccountStatus::PendingApproval, None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.set_approval(&reg.public_id, AccountStatus::Approved, Some(Decimal::new(-1, 0))),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            service.set_approval("USA000000000", AccountStatus::Approved, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_rejection_records_no_attribution() {
        let service = service();
        let reg = service.register("A", "B", "a@test.com", "secret1").unwrap();
        let rejected = service
            .set_approval(&reg.public_id, AccountStatus::Rejected, None)
            .unwrap();
        assert_eq!(rejected.status, AccountStatus::Rejected);
        assert!(rejected.approved_at.is_none());
        assert_eq!(rejected.balance, Decimal::ZERO);
    }
}
