//! In-memory repository implementation
//!
//! Accounts live in an arena (`Vec<Account>`) with index maps by id, email
//! and public id. Row-level locks come from a lock table: a unit of work
//! claims its rows in ascending id order and waits (bounded) for rows held
//! by other units. Writes are staged inside the unit and applied under the
//! arena and ledger write locks at commit, so readers never observe a
//! partial transfer.

use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, LedgerEntry};
use crate::ports::{Repository, UnitOfWork};

/// Default bounded wait for a row lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::storage("in-memory store lock poisoned")
}

#[derive(Default)]
struct Arena {
    accounts: Vec<Account>,
    by_id: HashMap<Uuid, usize>,
    by_email: HashMap<String, usize>,
    by_public_id: HashMap<String, usize>,
    serial_numbers: HashSet<String>,
}

impl Arena {
    fn get(&self, id: Uuid) -> Option<&Account> {
        self.by_id.get(&id).map(|&idx| &self.accounts[idx])
    }
}

#[derive(Default)]
struct LedgerLog {
    entries: Vec<LedgerEntry>,
    by_account: HashMap<Uuid, Vec<usize>>,
}

/// Lock table for account rows
#[derive(Default)]
struct RowLocks {
    held: Mutex<HashSet<Uuid>>,
    released: Condvar,
}

impl RowLocks {
    fn acquire(&self, ids: &[Uuid], timeout: Duration) -> Result<RowLockGuard<'_>> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().map_err(poisoned)?;
        let mut acquired = Vec::with_capacity(ordered.len());

        for id in ordered {
            while held.contains(&id) {
                let now = Instant::now();
                if now >= deadline {
                    for taken in &acquired {
                        held.remove(taken);
                    }
                    drop(held);
                    self.released.notify_all();
                    return Err(Error::storage(format!(
                        "timed out after {}ms waiting for lock on account {}",
                        timeout.as_millis(),
                        id
                    )));
                }
                let (guard, _) = self
                    .released
                    .wait_timeout(held, deadline - now)
                    .map_err(poisoned)?;
                held = guard;
            }
            held.insert(id);
            acquired.push(id);
        }

        Ok(RowLockGuard {
            locks: self,
            ids: acquired,
        })
    }
}

/// Releases its rows when dropped
struct RowLockGuard<'a> {
    locks: &'a RowLocks,
    ids: Vec<Uuid>,
}

impl RowLockGuard<'_> {
    fn holds(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }
}

impl Drop for RowLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}

/// Arena-backed repository for a single process
pub struct MemoryRepository {
    arena: RwLock<Arena>,
    ledger: Mutex<LedgerLog>,
    locks: RowLocks,
    lock_timeout: Duration,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            arena: RwLock::new(Arena::default()),
            ledger: Mutex::new(LedgerLog::default()),
            locks: RowLocks::default(),
            lock_timeout,
        }
    }

    fn ledger(&self) -> Result<MutexGuard<'_, LedgerLog>> {
        self.ledger.lock().map_err(poisoned)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Unit of work over the in-memory store
pub struct MemoryUnit<'a> {
    repo: &'a MemoryRepository,
    guard: RowLockGuard<'a>,
    staged_accounts: HashMap<Uuid, Account>,
    staged_entries: Vec<LedgerEntry>,
}

impl UnitOfWork for MemoryUnit<'_> {
    fn account(&mut self, id: Uuid) -> Result<Option<Account>> {
        if let Some(staged) = self.staged_accounts.get(&id) {
            return Ok(Some(staged.clone()));
        }
        let arena = self.repo.arena.read().map_err(poisoned)?;
        Ok(arena.get(id).cloned())
    }

    fn write_account(&mut self, account: &Account) -> Result<()> {
        if !self.guard.holds(account.id) {
            return Err(Error::storage(format!(
                "account {} is not locked by this unit of work",
                account.id
            )));
        }
        let exists = self.repo.arena.read().map_err(poisoned)?.get(account.id).is_some();
        if !exists {
            return Err(Error::not_found(format!("account {}", account.id)));
        }
        self.staged_accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn append_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        let exists = self
            .repo
            .arena
            .read()
            .map_err(poisoned)?
            .get(entry.account_id)
            .is_some();
        if !exists {
            return Err(Error::not_found(format!("account {}", entry.account_id)));
        }
        self.staged_entries.push(entry.clone());
        Ok(())
    }

    fn commit(self) -> Result<()> {
        // Lock order: arena, then ledger (same as every reader)
        let mut arena = self.repo.arena.write().map_err(poisoned)?;
        let mut ledger = self.repo.ledger()?;

        for (id, account) in self.staged_accounts {
            if let Some(&idx) = arena.by_id.get(&id) {
                let row = &mut arena.accounts[idx];
                row.balance = account.balance;
                row.status = account.status;
                row.approved_at = account.approved_at;
                row.approved_by = account.approved_by;
            }
        }

        for entry in self.staged_entries {
            let idx = ledger.entries.len();
            ledger.by_account.entry(entry.account_id).or_default().push(idx);
            ledger.entries.push(entry);
        }

        Ok(())
    }

    fn rollback(self) -> Result<()> {
        // Staged writes and row locks are released on drop
        Ok(())
    }
}

impl Repository for MemoryRepository {
    type Unit<'a> = MemoryUnit<'a>;

    fn begin(&self, lock_ids: &[Uuid]) -> Result<MemoryUnit<'_>> {
        let guard = self.locks.acquire(lock_ids, self.lock_timeout)?;
        Ok(MemoryUnit {
            repo: self,
            guard,
            staged_accounts: HashMap::new(),
            staged_entries: Vec::new(),
        })
    }

    fn insert_account(&self, account: &Account) -> Result<()> {
        let mut arena = self.arena.write().map_err(poisoned)?;

        if arena.by_email.contains_key(&account.email) {
            return Err(Error::DuplicateEmail(account.email.clone()));
        }
        if arena.by_public_id.contains_key(&account.public_id) {
            return Err(Error::DuplicateExternalId(account.public_id.clone()));
        }
        if arena.serial_numbers.contains(&account.serial_number) {
            return Err(Error::DuplicateExternalId(account.serial_number.clone()));
        }
        if arena.by_id.contains_key(&account.id) {
            return Err(Error::storage(format!("account id {} already exists", account.id)));
        }

        let idx = arena.accounts.len();
        arena.by_id.insert(account.id, idx);
        arena.by_email.insert(account.email.clone(), idx);
        arena.by_public_id.insert(account.public_id.clone(), idx);
        arena.serial_numbers.insert(account.serial_number.clone());
        arena.accounts.push(account.clone());
        Ok(())
    }

    fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        let arena = self.arena.read().map_err(poisoned)?;
        Ok(arena.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let arena = self.arena.read().map_err(poisoned)?;
        let key = Account::normalize_email(email);
        Ok(arena.by_email.get(&key).map(|&idx| arena.accounts[idx].clone()))
    }

    fn find_by_public_id(&self, public_id: &str) -> Result<Option<Account>> {
        let arena = self.arena.read().map_err(poisoned)?;
        Ok(arena
            .by_public_id
            .get(public_id)
            .map(|&idx| arena.accounts[idx].clone()))
    }

    fn find_by_external_id(
        &self,
        public_id: &str,
        serial_number: &str,
    ) -> Result<Option<Account>> {
        Ok(self
            .find_by_public_id(public_id)?
            .filter(|account| account.serial_number == serial_number))
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let arena = self.arena.read().map_err(poisoned)?;
        Ok(arena.accounts.clone())
    }

    fn ledger_for_account(&self, account_id: Uuid, limit: usize) -> Result<Vec<LedgerEntry>> {
        let ledger = self.ledger()?;
        Ok(ledger
            .by_account
            .get(&account_id)
            .map(|indices| {
                indices
                    .iter()
                    .rev()
                    .take(limit)
                    .map(|&idx| ledger.entries[idx].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn ledger_count(&self) -> Result<u64> {
        Ok(self.ledger()?.entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountStatus, EntryKind};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::thread;

    fn account(email: &str, public_id: &str) -> Account {
        Account::new("Test", "User", email, "hash", public_id, format!("LB{}", public_id))
    }

    #[test]
    fn test_insert_and_lookup() {
        let repo = MemoryRepository::new();
        let a = account("A@Test.com", "USA1");
        repo.insert_account(&a).unwrap();

        assert_eq!(repo.find_account(a.id).unwrap().unwrap().email, "a@test.com");
        assert!(repo.find_by_email(" a@TEST.com").unwrap().is_some());
        assert!(repo.find_by_external_id("USA1", "LBUSA1").unwrap().is_some());
        assert!(repo.find_by_external_id("USA1", "wrong").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_and_external_id() {
        let repo = MemoryRepository::new();
        repo.insert_account(&account("a@test.com", "USA1")).unwrap();

        let err = repo.insert_account(&account("a@test.com", "USA2")).unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(_)));

        let err = repo.insert_account(&account("b@test.com", "USA1")).unwrap_err();
        assert!(matches!(err, Error::DuplicateExternalId(_)));
    }

    #[test]
    fn test_uncommitted_writes_are_invisible() {
        let repo = MemoryRepository::new();
        let a = account("a@test.com", "USA1");
        repo.insert_account(&a).unwrap();

        {
            let mut unit = repo.begin(&[a.id]).unwrap();
            let mut row = unit.account(a.id).unwrap().unwrap();
            row.balance = Decimal::new(100, 0);
            row.status = AccountStatus::Approved;
            unit.write_account(&row).unwrap();
            unit.append_entry(&LedgerEntry::new(
                a.id,
                EntryKind::Deposit,
                Decimal::new(100, 0),
                "grant",
                None,
                Utc::now(),
            ))
            .unwrap();

            // The unit sees its own write, other readers do not
            assert_eq!(unit.account(a.id).unwrap().unwrap().balance, Decimal::new(100, 0));
            assert_eq!(repo.find_account(a.id).unwrap().unwrap().balance, Decimal::ZERO);
            // dropped without commit
        }

        assert_eq!(repo.find_account(a.id).unwrap().unwrap().balance, Decimal::ZERO);
        assert_eq!(repo.ledger_count().unwrap(), 0);
    }

    #[test]
    fn test_write_requires_lock() {
        let repo = MemoryRepository::new();
        let a = account("a@test.com", "USA1");
        let b = account("b@test.com", "USA2");
        repo.insert_account(&a).unwrap();
        repo.insert_account(&b).unwrap();

        let mut unit = repo.begin(&[a.id]).unwrap();
        let err = unit.write_account(&b).unwrap_err();
        assert!(matches!(err, Error::StorageFailure(_)));
    }

    #[test]
    fn test_append_to_unknown_account_fails() {
        let repo = MemoryRepository::new();
        let mut unit = repo.begin(&[]).unwrap();
        let entry = LedgerEntry::new(
            Uuid::new_v4(),
            EntryKind::Deposit,
            Decimal::ONE,
            "orphan",
            None,
            Utc::now(),
        );
        assert!(matches!(unit.append_entry(&entry), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_lock_timeout() {
        let repo = MemoryRepository::with_lock_timeout(Duration::from_millis(50));
        let a = account("a@test.com", "USA1");
        repo.insert_account(&a).unwrap();

        let _held = repo.begin(&[a.id]).unwrap();
        let err = repo.begin(&[a.id]).err().unwrap();
        assert!(matches!(err, Error::StorageFailure(_)));
    }

    #[test]
    fn test_lock_released_on_drop_wakes_waiter() {
        let repo = Arc::new(MemoryRepository::new());
        let a = account("a@test.com", "USA1");
        repo.insert_account(&a).unwrap();

        let unit = repo.begin(&[a.id]).unwrap();
        let waiter = {
            let repo = Arc::clone(&repo);
            thread::spawn(move || repo.begin(&[a.id]).map(|_| ()).is_ok())
        };
        thread::sleep(Duration::from_millis(20));
        drop(unit);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_ledger_newest_first_and_bounded() {
        let repo = MemoryRepository::new();
        let a = account("a@test.com", "USA1");
        repo.insert_account(&a).unwrap();

        for i in 1..=5 {
            repo.atomically(&[a.id], |unit| {
                unit.append_entry(&LedgerEntry::new(
                    a.id,
                    EntryKind::Deposit,
                    Decimal::new(i, 0),
                    format!("deposit {}", i),
                    None,
                    Utc::now(),
                ))
            })
            .unwrap();
        }

        let entries = repo.ledger_for_account(a.id, 3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].description, "deposit 5");
        assert_eq!(entries[2].description, "deposit 3");
    }
}
