//! Repository port - storage abstraction with an explicit transaction boundary

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, LedgerEntry};

/// An atomic unit of work over the account and ledger stores
///
/// A unit is opened by [`Repository::begin`] with the set of account rows it
/// may write. Nothing written through a unit is visible to other readers
/// until [`UnitOfWork::commit`] succeeds. Dropping a unit without committing
/// rolls it back.
pub trait UnitOfWork {
    /// Read an account as seen by this unit (including its own writes)
    fn account(&mut self, id: Uuid) -> Result<Option<Account>>;

    /// Write the mutable fields (balance, status, approval) of a locked account
    fn write_account(&mut self, account: &Account) -> Result<()>;

    /// Append a ledger entry; the owning account must exist
    fn append_entry(&mut self, entry: &LedgerEntry) -> Result<()>;

    /// Apply every write of this unit, or none of them
    fn commit(self) -> Result<()>;

    /// Discard every write of this unit
    fn rollback(self) -> Result<()>;
}

/// Account and ledger storage
///
/// Implementations (adapters) provide the actual storage. Reads outside a
/// unit of work see only committed state.
pub trait Repository: Send + Sync {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    // === Units of work ===

    /// Open a unit of work holding the row locks for `lock_ids`
    ///
    /// Locks are acquired in ascending id order regardless of the order
    /// given, so two units over the same pair of accounts cannot deadlock.
    fn begin(&self, lock_ids: &[Uuid]) -> Result<Self::Unit<'_>>;

    /// Run `work` inside a unit of work: commit on `Ok`, roll back on `Err`
    fn atomically<'a, T, F>(&'a self, lock_ids: &[Uuid], work: F) -> Result<T>
    where
        F: FnOnce(&mut Self::Unit<'a>) -> Result<T>,
    {
        let mut unit = self.begin(lock_ids)?;
        match work(&mut unit) {
            Ok(value) => {
                unit.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed after {}", err.kind());
                }
                Err(err)
            }
        }
    }

    // === Accounts ===

    /// Insert a new account (fails on a duplicate email or external id)
    fn insert_account(&self, account: &Account) -> Result<()>;

    /// Get account by ID
    fn find_account(&self, id: Uuid) -> Result<Option<Account>>;

    /// Get account by (normalized) email
    fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Get account by public ID alone (admin operations)
    fn find_by_public_id(&self, public_id: &str) -> Result<Option<Account>>;

    /// Get account by the full external identifier pair
    fn find_by_external_id(&self, public_id: &str, serial_number: &str)
        -> Result<Option<Account>>;

    /// Get all accounts, oldest first
    fn list_accounts(&self) -> Result<Vec<Account>>;

    // === Ledger ===

    /// Ledger entries for an account, newest first, at most `limit`
    fn ledger_for_account(&self, account_id: Uuid, limit: usize) -> Result<Vec<LedgerEntry>>;

    /// Total number of ledger entries
    fn ledger_count(&self) -> Result<u64>;
}
