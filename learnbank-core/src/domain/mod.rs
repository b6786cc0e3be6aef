//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod credential;
mod ledger;
pub mod money;
pub mod result;

pub use account::{
    generate_public_id, generate_serial_number, Account, AccountSnapshot, AccountStatus,
};
pub use credential::Argon2Params;
pub use ledger::{EntryKind, LedgerEntry, DEFAULT_TRANSFER_DESCRIPTION};
