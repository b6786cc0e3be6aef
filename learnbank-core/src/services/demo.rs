//! Demo service - manage demo mode
//!
//! Demo mode runs against a separate database (demo.duckdb) seeded with the
//! demo accounts. Seeding goes through the public operations only:
//! registration, approval and one transfer.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::demo::demo_users;
use crate::config::Config;
use crate::domain::result::{self, Error};
use crate::domain::AccountStatus;
use crate::ports::Repository;
use crate::BankContext;

const DEMO_DB: &str = "demo.duckdb";
const DEMO_TRANSFER_DESCRIPTION: &str = "Payment to Alice";

/// What a seeding run created
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoSeedResult {
    /// Emails of accounts created by this run
    pub created: Vec<String>,
    /// Emails that already existed and were left alone
    pub skipped: Vec<String>,
    /// Emails that already existed, still pending, and were approved now
    pub approved: Vec<String>,
    pub transfers: usize,
}

/// Seed the demo accounts into any bank
///
/// Accounts that already exist are skipped unless still pending approval,
/// in which case they are approved with their demo grant. The demo transfer
/// only runs when both of its accounts were created by this call, so seeding
/// twice is harmless.
pub fn seed<R: Repository>(bank: &BankContext<R>) -> result::Result<DemoSeedResult> {
    let mut outcome = DemoSeedResult::default();

    for user in demo_users() {
        match bank
            .accounts
            .register(user.first_name, user.last_name, user.email, user.password)
        {
            Ok(registration) => {
                bank.accounts.set_approval(
                    &registration.public_id,
                    AccountStatus::Approved,
                    Some(user.starting_balance),
                )?;
                outcome.created.push(registration.email);
            }
            Err(Error::DuplicateEmail(email)) => {
                let existing = bank.accounts.find_by_email(&email)?;
                if existing.status == AccountStatus::PendingApproval {
                    bank.accounts.set_approval(
                        &existing.public_id,
                        AccountStatus::Approved,
                        Some(user.starting_balance),
                    )?;
                    outcome.approved.push(email);
                } else {
                    outcome.skipped.push(email);
                }
            }
            Err(e) => return Err(e),
        }
    }

    let users = demo_users();
    if let [sender, recipient, ..] = users.as_slice() {
        let both_new = [sender.email, recipient.email]
            .iter()
            .all(|email| outcome.created.iter().any(|c| c == email));
        if both_new {
            let sender_id = bank.accounts.find_by_email(sender.email)?.id;
            bank.transfers.transfer(
                sender_id,
                recipient.email,
                Decimal::new(10000, 2),
                Some(DEMO_TRANSFER_DESCRIPTION),
            )?;
            outcome.transfers += 1;
        }
    }

    tracing::info!(
        created = outcome.created.len(),
        skipped = outcome.skipped.len(),
        approved = outcome.approved.len(),
        "demo data seeded"
    );
    Ok(outcome)
}

/// Demo service for managing demo mode
pub struct DemoService {
    bank_dir: PathBuf,
}

impl DemoService {
    pub fn new(bank_dir: &Path) -> Self {
        Self {
            bank_dir: bank_dir.to_path_buf(),
        }
    }

    /// Check if demo mode is currently enabled
    pub fn is_enabled(&self) -> Result<bool> {
        Ok(Config::load(&self.bank_dir)?.demo_mode)
    }

    /// Enable demo mode
    ///
    /// 1. Delete any existing demo database (fresh start)
    /// 2. Enable demo mode in config
    /// 3. Create the demo database and seed it
    pub fn enable(&self) -> Result<DemoSeedResult> {
        self.remove_demo_db()?;

        let mut config = Config::load(&self.bank_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.bank_dir)?;

        let bank = BankContext::open_file(&self.bank_dir.join(DEMO_DB), config)?;
        let outcome = seed(&bank).context("Failed to seed demo data")?;
        Ok(outcome)
    }

    /// Disable demo mode, deleting the demo database when `clean` is set
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.bank_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.bank_dir)?;

        if clean {
            self.remove_demo_db()?;
        }
        Ok(())
    }

    fn remove_demo_db(&self) -> Result<()> {
        for name in [DEMO_DB, "demo.duckdb.wal"] {
            let path = self.bank_dir.join(name);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Argon2Params;
    use tempfile::tempdir;

    fn fast_config() -> Config {
        Config {
            argon2: Argon2Params::minimal(),
            ..Config::default()
        }
    }

    #[test]
    fn test_seed_creates_approved_accounts_and_one_transfer() {
        let bank = BankContext::in_memory(fast_config());
        let outcome = seed(&bank).unwrap();

        assert_eq!(outcome.created.len(), 3);
        assert_eq!(outcome.transfers, 1);

        let demo = bank.accounts.find_by_email("demo@learningbank.com").unwrap();
        let alice = bank.accounts.find_by_email("alice@test.com").unwrap();
        let bob = bank.accounts.find_by_email("bob@test.com").unwrap();
        assert_eq!(demo.balance, Decimal::new(90000, 2));
        assert_eq!(alice.balance, Decimal::new(160000, 2));
        assert_eq!(bob.balance, Decimal::new(200000, 2));

        bank.auth.login("demo@learningbank.com", "demo123").unwrap();

        let summary = bank.status.summary().unwrap();
        assert_eq!(summary.total_balance, Decimal::new(450000, 2));
        // three grants plus one transfer pair
        assert_eq!(summary.ledger_entries, 5);
    }

    #[test]
    fn test_seed_twice_is_harmless() {
        let bank = BankContext::in_memory(fast_config());
        seed(&bank).unwrap();
        let again = seed(&bank).unwrap();

        assert!(again.created.is_empty());
        assert_eq!(again.skipped.len(), 3);
        assert!(again.approved.is_empty());
        assert_eq!(again.transfers, 0);
        assert_eq!(bank.status.summary().unwrap().total_accounts, 3);
    }

    #[test]
    fn test_seed_approves_pending_demo_account() {
        let bank = BankContext::in_memory(fast_config());
        bank.accounts
            .register("Bob", "Smith", "bob@test.com", "other-password")
            .unwrap();

        let outcome = seed(&bank).unwrap();
        assert_eq!(outcome.approved, vec!["bob@test.com".to_string()]);
        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.skipped.is_empty());

        let bob = bank.accounts.find_by_email("bob@test.com").unwrap();
        assert_eq!(bob.status, AccountStatus::Approved);
        assert_eq!(bob.balance, Decimal::new(200000, 2));

        // Approved now, so a second run leaves it alone
        let again = seed(&bank).unwrap();
        assert!(again.approved.is_empty());
        assert_eq!(again.skipped.len(), 3);
    }

    #[test]
    fn test_enable_and_disable() {
        let dir = tempdir().unwrap();
        fast_config().save(dir.path()).unwrap();
        let service = DemoService::new(dir.path());

        let outcome = service.enable().unwrap();
        assert_eq!(outcome.created.len(), 3);
        assert!(service.is_enabled().unwrap());
        assert!(dir.path().join(DEMO_DB).exists());

        service.disable(true).unwrap();
        assert!(!service.is_enabled().unwrap());
        assert!(!dir.path().join(DEMO_DB).exists());
    }
}
