//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::money::{from_minor_units, to_minor_units};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountStatus, EntryKind, LedgerEntry};
use crate::ports::{Repository, UnitOfWork};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_id, first_name, last_name, email, password_hash,
    public_id, serial_number, balance_minor, status, created_at, approved_at, approved_by";

const LEDGER_COLUMNS: &str =
    "entry_id, account_id, kind, amount_minor, description, counterpart_email, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::storage(err.to_string())
    }
}

/// DuckDB-backed repository
///
/// A single connection behind a mutex. A unit of work holds the connection
/// for its whole lifetime, which serializes units and makes every row lock
/// implicit. Isolation comes from the DuckDB transaction itself.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) a bank database
    ///
    /// Retries with exponential backoff when the file is locked by another
    /// process.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::storage(format!("failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory DuckDB database (schema applied)
    pub fn open_in_memory() -> Result<Self> {
        let repo = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        };
        repo.ensure_schema()?;
        Ok(repo)
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Extension autoloading off: nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage("database connection lock poisoned"))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::storage(format!("migration failed: {:#}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::debug!(applied = ?result.applied, "applied migrations");
        }
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// === Row mapping ===

struct AccountRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    public_id: String,
    serial_number: String,
    balance_minor: i64,
    status: String,
    created_at: String,
    approved_at: Option<String>,
    approved_by: Option<String>,
}

impl AccountRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            password_hash: row.get(4)?,
            public_id: row.get(5)?,
            serial_number: row.get(6)?,
            balance_minor: row.get(7)?,
            status: row.get(8)?,
            created_at: row.get(9)?,
            approved_at: row.get(10)?,
            approved_by: row.get(11)?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Account {
            id: parse_uuid(&row.id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            public_id: row.public_id,
            serial_number: row.serial_number,
            balance: from_minor_units(row.balance_minor),
            status: row.status.parse::<AccountStatus>().map_err(Error::storage)?,
            created_at: parse_timestamp(&row.created_at)?,
            approved_at: row.approved_at.as_deref().map(parse_timestamp).transpose()?,
            approved_by: row.approved_by,
        })
    }
}

struct LedgerRow {
    id: String,
    account_id: String,
    kind: String,
    amount_minor: i64,
    description: String,
    counterpart_email: Option<String>,
    created_at: String,
}

impl LedgerRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            kind: row.get(2)?,
            amount_minor: row.get(3)?,
            description: row.get(4)?,
            counterpart_email: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = Error;

    fn try_from(row: LedgerRow) -> Result<Self> {
        Ok(LedgerEntry {
            id: parse_uuid(&row.id)?,
            account_id: parse_uuid(&row.account_id)?,
            kind: row.kind.parse::<EntryKind>().map_err(Error::storage)?,
            amount: from_minor_units(row.amount_minor),
            description: row.description,
            counterpart_email: row.counterpart_email,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::storage(format!("corrupt id '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::storage(format!("corrupt timestamp '{}': {}", s, e)))
}

fn query_account(conn: &Connection, filter: &str, key: &str) -> Result<Option<Account>> {
    let sql = format!("SELECT {} FROM sys_accounts WHERE {} = ?", ACCOUNT_COLUMNS, filter);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_map([key], AccountRow::read)?.next().transpose()?;
    row.map(Account::try_from).transpose()
}

fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
    let count: i64 = conn.query_row(sql, [key], |row| row.get(0))?;
    Ok(count > 0)
}

// === Units of work ===

/// An open DuckDB transaction
///
/// Holds the connection until commit or rollback. Dropping an unfinished
/// unit rolls the transaction back.
pub struct DuckDbUnit<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl DuckDbUnit<'_> {
    fn finish(&mut self, statement: &str) -> Result<()> {
        self.finished = true;
        let result = self.conn.execute_batch(statement);
        if result.is_err() && statement == "COMMIT" {
            // A failed commit leaves the transaction aborted but open
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback after failed commit failed");
            }
        }
        result.map_err(|e| Error::storage(format!("{} failed: {}", statement, e)))
    }
}

impl UnitOfWork for DuckDbUnit<'_> {
    fn account(&mut self, id: Uuid) -> Result<Option<Account>> {
        query_account(&self.conn, "account_id", &id.to_string())
    }

    fn write_account(&mut self, account: &Account) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE sys_accounts
             SET balance_minor = ?, status = ?, approved_at = ?, approved_by = ?
             WHERE account_id = ?",
            params![
                to_minor_units(account.balance)?,
                account.status.as_str(),
                account.approved_at.map(|t| t.to_rfc3339()),
                account.approved_by,
                account.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("account {}", account.id)));
        }
        Ok(())
    }

    fn append_entry(&mut self, entry: &LedgerEntry) -> Result<()> {
        // Checked up front so a missing owner is NotFound, not a constraint error
        let owner_exists = exists(
            &self.conn,
            "SELECT COUNT(*) FROM sys_accounts WHERE account_id = ?",
            &entry.account_id.to_string(),
        )?;
        if !owner_exists {
            return Err(Error::not_found(format!("account {}", entry.account_id)));
        }

        self.conn.execute(
            "INSERT INTO sys_ledger_entries
                (entry_id, account_id, kind, amount_minor, description, counterpart_email, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id.to_string(),
                entry.account_id.to_string(),
                entry.kind.as_str(),
                to_minor_units(entry.amount)?,
                entry.description,
                entry.counterpart_email,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn commit(mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for DuckDbUnit<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of abandoned unit of work failed");
            }
        }
    }
}

impl Repository for DuckDbRepository {
    type Unit<'a> = DuckDbUnit<'a>;

    fn begin(&self, _lock_ids: &[Uuid]) -> Result<DuckDbUnit<'_>> {
        let conn = self.conn()?;
        conn.execute_batch("BEGIN TRANSACTION")?;
        Ok(DuckDbUnit {
            conn,
            finished: false,
        })
    }

    fn insert_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn()?;

        if exists(&conn, "SELECT COUNT(*) FROM sys_accounts WHERE email = ?", &account.email)? {
            return Err(Error::DuplicateEmail(account.email.clone()));
        }
        if exists(
            &conn,
            "SELECT COUNT(*) FROM sys_accounts WHERE public_id = ?",
            &account.public_id,
        )? {
            return Err(Error::DuplicateExternalId(account.public_id.clone()));
        }
        if exists(
            &conn,
            "SELECT COUNT(*) FROM sys_accounts WHERE serial_number = ?",
            &account.serial_number,
        )? {
            return Err(Error::DuplicateExternalId(account.serial_number.clone()));
        }

        conn.execute(
            "INSERT INTO sys_accounts (account_id, first_name, last_name, email, password_hash,
                public_id, serial_number, balance_minor, status, created_at, approved_at, approved_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.first_name,
                account.last_name,
                account.email,
                account.password_hash,
                account.public_id,
                account.serial_number,
                to_minor_units(account.balance)?,
                account.status.as_str(),
                account.created_at.to_rfc3339(),
                account.approved_at.map(|t| t.to_rfc3339()),
                account.approved_by,
            ],
        )?;
        Ok(())
    }

    fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.conn()?;
        query_account(&conn, "account_id", &id.to_string())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        query_account(&conn, "email", &Account::normalize_email(email))
    }

    fn find_by_public_id(&self, public_id: &str) -> Result<Option<Account>> {
        let conn = self.conn()?;
        query_account(&conn, "public_id", public_id)
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
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM sys_accounts ORDER BY created_at, email",
            ACCOUNT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], AccountRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(Account::try_from).collect()
    }

    fn ledger_for_account(&self, account_id: Uuid, limit: usize) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM sys_ledger_entries WHERE account_id = ? ORDER BY seq DESC LIMIT ?",
            LEDGER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![account_id.to_string(), limit as i64], LedgerRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    fn ledger_count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_ledger_entries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
