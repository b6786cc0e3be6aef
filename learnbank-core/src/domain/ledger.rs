//! Ledger entry domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default description for an outgoing transfer with none supplied
pub const DEFAULT_TRANSFER_DESCRIPTION: &str = "Money transfer";

/// Kind of balance-affecting movement. Direction lives here, not in the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    TransferIn,
    TransferOut,
    Deposit,
    /// Admin-set balance lowered by an approval
    Correction,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::TransferIn => "transfer_in",
            EntryKind::TransferOut => "transfer_out",
            EntryKind::Deposit => "deposit",
            EntryKind::Correction => "correction",
        }
    }

    /// True when the movement adds to the owner's balance
    pub fn is_credit(&self) -> bool {
        !matches!(self, EntryKind::TransferOut | EntryKind::Correction)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_in" => Ok(EntryKind::TransferIn),
            "transfer_out" => Ok(EntryKind::TransferOut),
            "deposit" => Ok(EntryKind::Deposit),
            "correction" => Ok(EntryKind::Correction),
            other => Err(format!("unknown ledger entry kind '{}'", other)),
        }
    }
}

/// An immutable record of one balance-affecting movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// Owner of this entry
    pub account_id: Uuid,
    pub kind: EntryKind,
    /// Always positive
    pub amount: Decimal,
    pub description: String,
    pub counterpart_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        account_id: Uuid,
        kind: EntryKind,
        amount: Decimal,
        description: impl Into<String>,
        counterpart_email: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            description: description.into(),
            counterpart_email,
            created_at,
        }
    }

    /// Build the matching pair written by a transfer: `transfer_out` on the
    /// sender and `transfer_in` on the recipient, same amount and timestamp.
    pub fn transfer_pair(
        sender_id: Uuid,
        sender_email: &str,
        recipient_id: Uuid,
        recipient_email: &str,
        amount: Decimal,
        description: &str,
        at: DateTime<Utc>,
    ) -> (LedgerEntry, LedgerEntry) {
        let outgoing = LedgerEntry::new(
            sender_id,
            EntryKind::TransferOut,
            amount,
            description,
            Some(recipient_email.to_string()),
            at,
        );
        let incoming = LedgerEntry::new(
            recipient_id,
            EntryKind::TransferIn,
            amount,
            format!("Received from {}", sender_email),
            Some(sender_email.to_string()),
            at,
        );
        (outgoing, incoming)
    }

    /// Amount with the direction applied (negative for outgoing)
    pub fn signed_amount(&self) -> Decimal {
        if self.kind.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}
