use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user name cannot be empty")]
    EmptyName,

    #[error("user email cannot be empty")]
    EmptyEmail,
}

/// A one-time password-recovery credential.
///
/// Keeping code and expiry in a single struct makes the "both present or
/// both absent" invariant structural: a `User` either has a full
/// `RecoveryCode` or none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Lifecycle of a user's recovery credential at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStatus {
    /// No code has been issued, or the last one was consumed.
    Inactive,
    /// A code is issued and has not yet expired.
    Active,
    /// A code is issued but its expiry has passed.
    Expired,
}

impl RecoveryCode {
    #[must_use]
    pub fn new(code: String, expires_at: DateTime<Utc>) -> Self {
        Self { code, expires_at }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true iff `supplied` matches the stored code exactly and the
    /// code has not expired at `now`. `now == expires_at` still validates.
    #[must_use]
    pub fn matches(&self, supplied: &str, now: DateTime<Utc>) -> bool {
        self.code == supplied && now <= self.expires_at
    }
}

/// A registered account owning subjects, goals, and study sessions.
///
/// Owned collections are reached through repositories by `UserId`; the
/// user record itself carries only identity, credentials, and the mutable
/// recovery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    password_hash: String,
    recovery: Option<RecoveryCode>,
}

impl User {
    /// Create a user with a validated name and email.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` or `UserError::EmptyEmail` if either
    /// field is blank after trimming.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Self, UserError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(UserError::EmptyName);
        }
        let email = email.into().trim().to_string();
        if email.is_empty() {
            return Err(UserError::EmptyEmail);
        }
        Ok(Self {
            id,
            name,
            email,
            password_hash: password_hash.into(),
            recovery: None,
        })
    }

    /// Rehydrate a user from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if name or email fail validation.
    pub fn from_persisted(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        recovery: Option<RecoveryCode>,
    ) -> Result<Self, UserError> {
        let mut user = Self::new(id, name, email, password_hash)?;
        user.recovery = recovery;
        Ok(user)
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn recovery(&self) -> Option<&RecoveryCode> {
        self.recovery.as_ref()
    }

    /// Replace any prior recovery code. A previously issued code becomes
    /// permanently invalid, even if it had not expired yet.
    pub fn set_recovery(&mut self, code: RecoveryCode) {
        self.recovery = Some(code);
    }

    /// Drop the recovery code, returning the state to inactive.
    pub fn clear_recovery(&mut self) {
        self.recovery = None;
    }

    /// Replace the stored password hash.
    pub fn set_password_hash(&mut self, hash: impl Into<String>) {
        self.password_hash = hash.into();
    }

    /// Classify the recovery state at `now`.
    #[must_use]
    pub fn recovery_status(&self, now: DateTime<Utc>) -> RecoveryStatus {
        match &self.recovery {
            None => RecoveryStatus::Inactive,
            Some(rc) if now <= rc.expires_at() => RecoveryStatus::Active,
            Some(_) => RecoveryStatus::Expired,
        }
    }
}
