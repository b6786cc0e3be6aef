//! Learning Bank core - accounts, ledger and transfers
//!
//! Hexagonal layout:
//!
//! - **domain**: entities, money helpers and the error type
//! - **ports**: the storage traits (`Repository`, `UnitOfWork`)
//! - **services**: account store, ledger, approval gate, transfer engine,
//!   authentication, status, demo seeding, event log
//! - **adapters**: in-memory arena and DuckDB storage, demo fixtures

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::memory::MemoryRepository;
use config::Config;
use ports::Repository;
use services::{AccountService, AuthService, LedgerService, StatusService, TransferService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{Account, AccountSnapshot, AccountStatus, EntryKind, LedgerEntry};

/// Main context for bank operations
///
/// Holds the configuration, the repository and every service built over it.
pub struct BankContext<R: Repository> {
    pub config: Config,
    pub repository: Arc<R>,
    pub accounts: AccountService<R>,
    pub ledger: LedgerService<R>,
    pub transfers: TransferService<R>,
    pub auth: AuthService<R>,
    pub status: StatusService<R>,
}

impl<R: Repository> BankContext<R> {
    /// Build the services over an existing repository
    pub fn with_repository(config: Config, repository: Arc<R>) -> Self {
        Self {
            accounts: AccountService::new(Arc::clone(&repository), &config),
            ledger: LedgerService::new(Arc::clone(&repository), config.ledger_page_size),
            transfers: TransferService::new(Arc::clone(&repository)),
            auth: AuthService::new(Arc::clone(&repository), &config),
            status: StatusService::new(Arc::clone(&repository)),
            repository,
            config,
        }
    }
}

impl BankContext<DuckDbRepository> {
    /// Open the bank in `bank_dir`, using the database for the current mode
    pub fn open(bank_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(bank_dir)
            .with_context(|| format!("Failed to create {}", bank_dir.display()))?;
        let config = Config::load(bank_dir)?;
        let db_path = bank_dir.join(config.db_filename());
        Self::open_file(&db_path, config)
    }

    /// Open a specific database file
    pub fn open_file(db_path: &Path, config: Config) -> Result<Self> {
        let repository = DuckDbRepository::new(db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        repository.ensure_schema()?;
        Ok(Self::with_repository(config, Arc::new(repository)))
    }
}

impl BankContext<MemoryRepository> {
    /// A bank that lives only as long as this value
    pub fn in_memory(config: Config) -> Self {
        let repository = MemoryRepository::with_lock_timeout(config.lock_timeout());
        Self::with_repository(config, Arc::new(repository))
    }
}
