//! Authentication - credential check followed by the approval gate

use std::sync::Arc;

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::AccountSnapshot;
use crate::ports::Repository;
use crate::services::approval::ApprovalGate;
use crate::services::credential::CredentialHasher;

pub struct AuthService<R: Repository> {
    repository: Arc<R>,
    hasher: CredentialHasher,
}

impl<R: Repository> AuthService<R> {
    pub fn new(repository: Arc<R>, config: &Config) -> Self {
        Self {
            repository,
            hasher: CredentialHasher::new(config.argon2.clone()),
        }
    }

    /// Check credentials and approval
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller. Correct credentials on an unapproved account report the
    /// current status instead.
    pub fn login(&self, email: &str, password: &str) -> Result<AccountSnapshot> {
        let account = self
            .repository
            .find_by_email(email)?
            .ok_or(Error::InvalidCredentials)?;

        if !self.hasher.verify(password, &account.password_hash) {
            return Err(Error::InvalidCredentials);
        }
        if !ApprovalGate::can_login(&account) {
            return Err(Error::NotApproved(account.status));
        }

        tracing::debug!(account_id = %account.id, "login accepted");
        Ok(account.snapshot())
    }
}
