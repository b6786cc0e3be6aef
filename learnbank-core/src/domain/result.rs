//! Result and error types for the core library

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::account::AccountStatus;

/// Core library error type
///
/// Every variant is scoped to a single request; none is fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: need {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Recipient cannot receive transfers (status: {0})")]
    RecipientNotApproved(AccountStatus),

    #[error("Cannot transfer money to your own account")]
    SelfTransfer,

    /// Internal: the authenticated caller's account has disappeared
    #[error("Sender account not found: {0}")]
    SenderNotFound(Uuid),

    #[error("User with this email already exists: {0}")]
    DuplicateEmail(String),

    #[error("External identifier already in use: {0}")]
    DuplicateExternalId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account not approved (status: {0})")]
    NotApproved(AccountStatus),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The atomic unit of work could not commit; nothing was applied
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl Error {
    /// Create a storage failure
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFailure(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable tag for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidAmount(_) => "invalid_amount",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::RecipientNotFound(_) => "recipient_not_found",
            Error::RecipientNotApproved(_) => "recipient_not_approved",
            Error::SelfTransfer => "self_transfer",
            Error::SenderNotFound(_) => "sender_not_found",
            Error::DuplicateEmail(_) => "duplicate_email",
            Error::DuplicateExternalId(_) => "duplicate_external_id",
            Error::NotFound(_) => "not_found",
            Error::InvalidCredentials => "invalid_credentials",
            Error::NotApproved(_) => "not_approved",
            Error::Validation(_) => "validation",
            Error::StorageFailure(_) => "storage_failure",
        }
    }

    /// True for "you cannot do this" failures, false for "try again later"
    /// and internal failures.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, Error::StorageFailure(_) | Error::SenderNotFound(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Structured operation result for callers outside the core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            context: None,
        }
    }

    /// Create a failed result from a core error
    pub fn fail(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            context: None,
        }
    }

    /// Attach context to a result
    pub fn with_context(mut self, context: HashMap<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
        assert!(result.error_kind.is_none());
    }

    #[test]
    fn test_from_result_carries_kind() {
        let err: Result<i32> = Err(Error::RecipientNotApproved(AccountStatus::PendingApproval));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("recipient_not_approved"));
        assert!(result.error.unwrap().contains("pending_approval"));
    }

    #[test]
    fn test_business_rule_split() {
        assert!(Error::InvalidAmount("x".into()).is_business_rule());
        assert!(Error::SelfTransfer.is_business_rule());
        assert!(!Error::storage("disk full").is_business_rule());
        assert!(!Error::SenderNotFound(Uuid::nil()).is_business_rule());
    }
}
