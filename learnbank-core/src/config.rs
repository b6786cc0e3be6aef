//! Configuration management
//!
//! Reads `settings.json` from the bank directory:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "bank": {
//!     "startingBalance": "1000.00",
//!     "approvedBy": "Admin",
//!     "ledgerPageSize": 50,
//!     "minPasswordLength": 6,
//!     "lockTimeoutMs": 5000,
//!     "argon2": { "timeCost": 2, "memoryCost": 19456, "parallelism": 1, "hashLen": 32 }
//!   }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Argon2Params;

pub const DEFAULT_STARTING_BALANCE: Decimal = Decimal::from_parts(100000, 0, 0, false, 2);
pub const DEFAULT_APPROVED_BY: &str = "Admin";
pub const DEFAULT_LEDGER_PAGE_SIZE: usize = 50;
pub const MAX_LEDGER_PAGE_SIZE: usize = 500;
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    bank: BankSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BankSettings {
    starting_balance: Decimal,
    approved_by: String,
    ledger_page_size: usize,
    min_password_length: usize,
    lock_timeout_ms: u64,
    argon2: Argon2Params,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            approved_by: DEFAULT_APPROVED_BY.to_string(),
            ledger_page_size: DEFAULT_LEDGER_PAGE_SIZE,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            argon2: Argon2Params::default(),
        }
    }
}

/// Bank configuration (typed view of settings.json)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    /// Grant applied on approval when the admin gives none
    pub starting_balance: Decimal,
    /// Attribution recorded on approval
    pub approved_by: String,
    /// Default ledger listing length
    pub ledger_page_size: usize,
    pub min_password_length: usize,
    /// Bounded wait for a row lock (in-memory store)
    pub lock_timeout_ms: u64,
    pub argon2: Argon2Params,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(&SettingsFile::default())
    }
}

impl Config {
    /// Load config from the bank directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (`lb demo on`)
    /// 2. Environment variable LEARNBANK_DEMO_MODE (for CI/testing)
    pub fn load(bank_dir: &Path) -> Result<Self> {
        let raw = Self::read_settings(bank_dir)?;
        let mut config = Self::from_settings(&raw);

        match std::env::var("LEARNBANK_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => config.demo_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => config.demo_mode = false,
            _ => {}
        }

        Ok(config)
    }

    /// Save config to the bank directory, preserving unmanaged keys
    pub fn save(&self, bank_dir: &Path) -> Result<()> {
        let settings_path = bank_dir.join("settings.json");
        let mut settings = Self::read_settings(bank_dir)?;

        settings.app.demo_mode = self.demo_mode;
        settings.bank = BankSettings {
            starting_balance: self.starting_balance,
            approved_by: self.approved_by.clone(),
            ledger_page_size: self.ledger_page_size,
            min_password_length: self.min_password_length,
            lock_timeout_ms: self.lock_timeout_ms,
            argon2: self.argon2.clone(),
        };

        std::fs::create_dir_all(bank_dir)
            .with_context(|| format!("Failed to create {}", bank_dir.display()))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    fn read_settings(bank_dir: &Path) -> Result<SettingsFile> {
        let settings_path = bank_dir.join("settings.json");
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(&settings_path)
            .with_context(|| format!("Failed to read {}", settings_path.display()))?;
        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(path = %settings_path.display(), error = %e, "ignoring malformed settings file");
                Ok(SettingsFile::default())
            }
        }
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        Self {
            demo_mode: raw.app.demo_mode,
            starting_balance: raw.bank.starting_balance,
            approved_by: raw.bank.approved_by.clone(),
            ledger_page_size: raw.bank.ledger_page_size.clamp(1, MAX_LEDGER_PAGE_SIZE),
            min_password_length: raw.bank.min_password_length,
            lock_timeout_ms: raw.bank.lock_timeout_ms,
            argon2: raw.bank.argon2.clone(),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Database file for the current mode
    pub fn db_filename(&self) -> &'static str {
        if self.demo_mode {
            "demo.duckdb"
        } else {
            "learnbank.duckdb"
        }
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.starting_balance, Decimal::new(100000, 2));
        assert_eq!(config.approved_by, "Admin");
        assert_eq!(config.ledger_page_size, 50);
        assert_eq!(config.min_password_length, 6);
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_bank_section_and_cap() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"bank": {"approvedBy": "Ops", "ledgerPageSize": 9000, "startingBalance": 250}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.approved_by, "Ops");
        assert_eq!(config.ledger_page_size, MAX_LEDGER_PAGE_SIZE);
        assert_eq!(config.starting_balance, Decimal::new(250, 0));
        assert_eq!(config.min_password_length, DEFAULT_MIN_PASSWORD_LENGTH);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app": {"demoMode": false, "theme": "dark"}, "plugins": {"x": 1}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("settings.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["app"]["demoMode"], true);
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["plugins"]["x"], 1);
    }

    #[test]
    fn test_db_filename_follows_mode() {
        let mut config = Config::default();
        assert_eq!(config.db_filename(), "learnbank.duckdb");
        config.enable_demo_mode();
        assert_eq!(config.db_filename(), "demo.duckdb");
    }
}
