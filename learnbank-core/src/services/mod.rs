//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod account;
pub mod approval;
pub mod auth;
pub mod credential;
pub mod demo;
pub mod ledger;
pub mod logging;
pub mod migration;
pub mod status;
pub mod transfer;

pub use account::{AccountService, Registration};
pub use approval::ApprovalGate;
pub use auth::AuthService;
pub use credential::CredentialHasher;
pub use demo::{DemoSeedResult, DemoService};
pub use ledger::LedgerService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{ApprovalDetails, BankSummary, StatusReport, StatusService};
pub use transfer::{TransferReceipt, TransferService};
