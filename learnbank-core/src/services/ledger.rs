//! Ledger - append-only record of balance-affecting movements

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::MAX_LEDGER_PAGE_SIZE;
use crate::domain::money::validate_amount;
use crate::domain::result::{Error, Result};
use crate::domain::{EntryKind, LedgerEntry};
use crate::ports::{Repository, UnitOfWork};

/// Ledger operations
///
/// Appending never changes a balance. Transfers and approval grants write
/// their entries through their own unit of work; `append` is for movements
/// recorded on their own.
pub struct LedgerService<R: Repository> {
    repository: Arc<R>,
    page_size: usize,
}

impl<R: Repository> LedgerService<R> {
    pub fn new(repository: Arc<R>, page_size: usize) -> Self {
        Self {
            repository,
            page_size: page_size.clamp(1, MAX_LEDGER_PAGE_SIZE),
        }
    }

    /// Append one entry to an existing account's ledger
    pub fn append(
        &self,
        account_id: Uuid,
        kind: EntryKind,
        amount: Decimal,
        description: &str,
        counterpart_email: Option<&str>,
    ) -> Result<LedgerEntry> {
        let amount = validate_amount(amount)?;
        let entry = LedgerEntry::new(
            account_id,
            kind,
            amount,
            description.trim(),
            counterpart_email.map(|e| e.trim().to_lowercase()),
            Utc::now(),
        );

        self.repository.atomically(&[account_id], |unit| {
            if unit.account(account_id)?.is_none() {
                return Err(Error::not_found(format!("account {}", account_id)));
            }
            unit.append_entry(&entry)
        })?;

        Ok(entry)
    }

    /// Entries for an account, newest first
    ///
    /// `limit` defaults to the configured page size and is capped.
    pub fn list_for_account(&self, account_id: Uuid, limit: Option<usize>) -> Result<Vec<LedgerEntry>> {
        if self.repository.find_account(account_id)?.is_none() {
            return Err(Error::not_found(format!("account {}", account_id)));
        }
        let limit = limit.unwrap_or(self.page_size).clamp(1, MAX_LEDGER_PAGE_SIZE);
        self.repository.ledger_for_account(account_id, limit)
    }
}
