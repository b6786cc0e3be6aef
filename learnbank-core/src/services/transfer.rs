//! Transfer engine - moves money between two accounts as one unit of work
//!
//! Preconditions are checked in a fixed order, each with its own error:
//!
//! 1. amount is positive with at most cent precision (`InvalidAmount`)
//! 2. sender exists (`SenderNotFound`)
//! 3. sender balance covers the amount (`InsufficientFunds`)
//! 4. recipient exists by email (`RecipientNotFound`)
//! 5. recipient is approved (`RecipientNotApproved`)
//! 6. recipient is not the sender (`SelfTransfer`)
//! 7. recipient balance stays within the maximum (`InvalidAmount`)
//!
//! Checks 2-6 read inside the unit of work that holds both row locks, so the
//! balance that passes the funds check is the balance that gets written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::{max_balance, validate_amount};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, LedgerEntry, DEFAULT_TRANSFER_DESCRIPTION};
use crate::ports::{Repository, UnitOfWork};
use crate::services::approval::ApprovalGate;

/// Result of a completed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub new_sender_balance: Decimal,
    pub amount: Decimal,
    pub recipient_email: String,
    pub description: String,
    pub out_entry_id: Uuid,
    pub in_entry_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Transfer engine
pub struct TransferService<R: Repository> {
    repository: Arc<R>,
}

impl<R: Repository> TransferService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Move `amount` from the sender to the account registered under
    /// `recipient_email`
    ///
    /// Either both balances change and both ledger entries exist, or
    /// nothing changes.
    pub fn transfer(
        &self,
        sender_id: Uuid,
        recipient_email: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<TransferReceipt> {
        let span = tracing::info_span!("transfer", sender = %sender_id);
        let _enter = span.enter();

        let amount = validate_amount(amount)?;
        let recipient_email = Account::normalize_email(recipient_email);
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_TRANSFER_DESCRIPTION)
            .to_string();

        // Ids and emails never change, so the recipient row can be resolved
        // before the locks are taken and re-read under them.
        let recipient_id = self.repository.find_by_email(&recipient_email)?.map(|a| a.id);
        let mut lock_ids = vec![sender_id];
        lock_ids.extend(recipient_id);

        let result = self.repository.atomically(&lock_ids, |unit| {
            let mut sender = unit
                .account(sender_id)?
                .ok_or(Error::SenderNotFound(sender_id))?;

            if sender.balance < amount {
                return Err(Error::InsufficientFunds {
                    needed: amount,
                    available: sender.balance,
                });
            }

            let mut recipient = match recipient_id {
                Some(id) => unit.account(id)?,
                None => None,
            }
            .ok_or_else(|| Error::RecipientNotFound(recipient_email.clone()))?;

            if !ApprovalGate::can_receive_transfer(&recipient) {
                return Err(Error::RecipientNotApproved(recipient.status));
            }
            if recipient.id == sender.id {
                return Err(Error::SelfTransfer);
            }

            let credited = recipient
                .balance
                .checked_add(amount)
                .filter(|balance| *balance <= max_balance())
                .ok_or_else(|| {
                    Error::InvalidAmount(format!(
                        "recipient balance would exceed the maximum of {}",
                        max_balance()
                    ))
                })?;
            // sender.balance >= amount was checked above
            sender.balance = sender
                .balance
                .checked_sub(amount)
                .ok_or_else(|| Error::InvalidAmount(format!("cannot debit {}", amount)))?;
            recipient.balance = credited;
            unit.write_account(&sender)?;
            unit.write_account(&recipient)?;

            let now = Utc::now();
            let (outgoing, incoming) = LedgerEntry::transfer_pair(
                sender.id,
                &sender.email,
                recipient.id,
                &recipient.email,
                amount,
                &description,
                now,
            );
            unit.append_entry(&outgoing)?;
            unit.append_entry(&incoming)?;

            Ok(TransferReceipt {
                new_sender_balance: sender.balance,
                amount,
                recipient_email: recipient.email.clone(),
                description: description.clone(),
                out_entry_id: outgoing.id,
                in_entry_id: incoming.id,
                timestamp: now,
            })
        });

        match &result {
            Ok(receipt) => tracing::info!(out_entry = %receipt.out_entry_id, "transfer committed"),
            Err(e) if e.is_business_rule() => tracing::debug!(kind = e.kind(), "transfer refused"),
            Err(e) => tracing::error!(kind = e.kind(), error = %e, "transfer failed"),
        }

        result
    }
}
