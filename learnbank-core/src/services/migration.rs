//! Schema migrations for the bank and log databases
//!
//! Each database carries an embedded, ordered list of `(name, sql)` pairs.
//! The first entry creates `sys_migrations`; every applied name is recorded
//! there, so opening a database twice applies nothing the second time.

use std::collections::HashSet;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// What a migration run did
#[derive(Debug)]
pub struct MigrationResult {
    /// Migrations applied by this run, in order
    pub applied: Vec<String>,
    /// Migrations found already recorded
    pub already_applied: usize,
}

/// Applies an embedded migration list to one connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    /// Bank schema (accounts and ledger)
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(
        conn: &'a Connection,
        migrations: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet recorded, in list order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let recorded = self.recorded()?;

        let mut result = MigrationResult {
            applied: Vec::new(),
            already_applied: 0,
        };

        for (name, sql) in self.migrations {
            if recorded.contains(*name) {
                result.already_applied += 1;
                continue;
            }
            self.conn
                .execute_batch(sql)
                .with_context(|| format!("migration {} failed", name))?;
            self.conn
                .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])
                .with_context(|| format!("could not record migration {}", name))?;
            tracing::debug!(migration = name, "applied migration");
            result.applied.push(name.to_string());
        }

        Ok(result)
    }

    fn has_tracking_table(&self) -> Result<bool> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(tables > 0)
    }

    fn recorded(&self) -> Result<HashSet<String>> {
        if !self.has_tracking_table()? {
            return Ok(HashSet::new());
        }
        Ok(self.get_applied()?.into_iter().collect())
    }

    /// Recorded migration names, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Names in the embedded list that are not recorded yet
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let recorded = self.recorded()?;
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !recorded.contains(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;

    #[test]
    fn test_bank_schema_applies_once() {
        let conn = Connection::open_in_memory().unwrap();

        let first = MigrationService::new(&conn).run_pending().unwrap();
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert_eq!(first.already_applied, 0);

        let second = MigrationService::new(&conn).run_pending().unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.already_applied, MIGRATIONS.len());
        assert!(MigrationService::new(&conn).get_pending().unwrap().is_empty());
    }

    #[test]
    fn test_pending_on_fresh_database_lists_everything() {
        let conn = Connection::open_in_memory().unwrap();
        let pending = MigrationService::new(&conn).get_pending().unwrap();
        assert_eq!(pending.len(), MIGRATIONS.len());
        assert_eq!(pending[0], "000_migrations.sql");
    }

    #[test]
    fn test_log_migrations_create_log_table() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS)
            .run_pending()
            .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_balance_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let result = conn.execute(
            "INSERT INTO sys_accounts (account_id, first_name, last_name, email, password_hash,
                public_id, serial_number, balance_minor, status, created_at)
             VALUES ('a', 'A', 'B', 'a@test.com', 'h', 'USA1', 'LB1', -1, 'approved', 'now')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ledger_rows_need_an_owning_account() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let orphan = conn.execute(
            "INSERT INTO sys_ledger_entries (entry_id, account_id, kind, amount_minor, description, created_at)
             VALUES ('e1', 'missing', 'deposit', 100, 'x', 'now')",
            [],
        );
        assert!(orphan.is_err());

        conn.execute(
            "INSERT INTO sys_accounts (account_id, first_name, last_name, email, password_hash,
                public_id, serial_number, balance_minor, status, created_at)
             VALUES ('a', 'A', 'B', 'a@test.com', 'h', 'USA1', 'LB1', 100, 'approved', 'now')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO sys_ledger_entries (entry_id, account_id, kind, amount_minor, description, created_at)
             VALUES ('e2', 'a', 'deposit', 100, 'x', 'now')",
            [],
        )
        .unwrap();

        // Balance updates on a referenced account still go through
        conn.execute("UPDATE sys_accounts SET balance_minor = 50 WHERE account_id = 'a'", [])
            .unwrap();
    }
}
