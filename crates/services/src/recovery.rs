use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::Duration;
use rand::Rng;

use planner_core::Clock;
use planner_core::model::{RecoveryCode, User};
use storage::repository::UserRepository;

use crate::error::RecoveryError;

/// How long an issued recovery code stays valid.
pub const RECOVERY_CODE_TTL_MINUTES: i64 = 15;

/// Manages the password-recovery code lifecycle.
///
/// A user holds at most one code at a time; issuing a new one overwrites
/// the previous code, and a successful reset consumes it. The code is
/// single-use by construction: validation after consumption finds no code.
#[derive(Clone)]
pub struct RecoveryService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl RecoveryService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Issue a fresh 6-digit code for the account behind `email` and
    /// persist it with a 15-minute expiry. Returns the code so the caller
    /// can deliver it out of band.
    ///
    /// Any previously issued code becomes permanently invalid, expired or
    /// not.
    ///
    /// # Errors
    ///
    /// Returns `RecoveryError::UserNotFound` for an unknown email and
    /// `RecoveryError::Storage` when persistence fails.
    pub async fn generate(&self, email: &str) -> Result<String, RecoveryError> {
        let mut user = self.require_user(email).await?;

        let code = format!("{:06}", rand::rng().random_range(0..=999_999_u32));
        let expires_at = self.clock.now() + Duration::minutes(RECOVERY_CODE_TTL_MINUTES);
        user.set_recovery(RecoveryCode::new(code.clone(), expires_at));
        self.users.upsert_user(&user).await?;

        tracing::debug!(user = %user.id(), %expires_at, "issued recovery code");
        Ok(code)
    }

    /// Check whether `supplied` is the user's current, unexpired code.
    ///
    /// Matching is an exact string comparison; a code is still valid at the
    /// exact expiry instant.
    ///
    /// # Errors
    ///
    /// Returns `RecoveryError::UserNotFound` for an unknown email.
    pub async fn validate(&self, email: &str, supplied: &str) -> Result<bool, RecoveryError> {
        let user = self.require_user(email).await?;
        let now = self.clock.now();
        Ok(user
            .recovery()
            .is_some_and(|code| code.matches(supplied, now)))
    }

    /// Consume the code: re-validate, then replace the password hash and
    /// clear the recovery state in a single persisted update.
    ///
    /// # Errors
    ///
    /// Returns `RecoveryError::UserNotFound` for an unknown email,
    /// `RecoveryError::InvalidCode` when the code is wrong, expired, or
    /// already used, and `RecoveryError::Hash` when hashing fails.
    pub async fn reset_password(
        &self,
        email: &str,
        supplied: &str,
        new_password: &str,
    ) -> Result<(), RecoveryError> {
        let mut user = self.require_user(email).await?;
        let now = self.clock.now();

        let valid = user
            .recovery()
            .is_some_and(|code| code.matches(supplied, now));
        if !valid {
            tracing::warn!(user = %user.id(), "rejected password reset");
            return Err(RecoveryError::InvalidCode);
        }

        let hash = hash_password(new_password)?;
        user.set_password_hash(hash);
        user.clear_recovery();
        self.users.upsert_user(&user).await?;

        tracing::debug!(user = %user.id(), "password reset completed");
        Ok(())
    }

    async fn require_user(&self, email: &str) -> Result<User, RecoveryError> {
        self.users
            .find_user_by_email(email)
            .await?
            .ok_or(RecoveryError::UserNotFound)
    }
}

fn hash_password(password: &str) -> Result<String, RecoveryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RecoveryError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use planner_core::model::UserId;
    use planner_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    const EMAIL: &str = "ana@example.com";

    async fn seeded_repo() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let user = User::new(UserId::new(1), "Ana", EMAIL, "old-hash").unwrap();
        UserRepository::upsert_user(&repo, &user).await.unwrap();
        repo
    }

    fn service(repo: &InMemoryRepository) -> RecoveryService {
        RecoveryService::new(fixed_clock(), Arc::new(repo.clone()))
    }

    fn service_at(repo: &InMemoryRepository, now: chrono::DateTime<chrono::Utc>) -> RecoveryService {
        RecoveryService::new(Clock::fixed(now), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn generate_issues_six_digit_code_with_ttl() {
        let repo = seeded_repo().await;
        let code = service(&repo).generate(EMAIL).await.unwrap();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        let stored = repo
            .find_user_by_email(EMAIL)
            .await
            .unwrap()
            .unwrap();
        let rc = stored.recovery().expect("recovery state");
        assert_eq!(rc.code(), code);
        assert_eq!(rc.expires_at(), fixed_now() + Duration::minutes(15));
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo);

        assert!(matches!(
            svc.generate("nobody@example.com").await.unwrap_err(),
            RecoveryError::UserNotFound
        ));
        assert!(matches!(
            svc.validate("nobody@example.com", "123456").await.unwrap_err(),
            RecoveryError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn validate_respects_expiry_window() {
        let repo = seeded_repo().await;
        let code = service(&repo).generate(EMAIL).await.unwrap();

        let just_before = fixed_now() + Duration::minutes(14) + Duration::seconds(59);
        assert!(service_at(&repo, just_before)
            .validate(EMAIL, &code)
            .await
            .unwrap());

        let just_after = fixed_now() + Duration::minutes(15) + Duration::seconds(1);
        assert!(!service_at(&repo, just_after)
            .validate(EMAIL, &code)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn validate_requires_exact_match() {
        let repo = seeded_repo().await;
        let code = service(&repo).generate(EMAIL).await.unwrap();
        let svc = service(&repo);

        assert!(svc.validate(EMAIL, &code).await.unwrap());
        assert!(!svc.validate(EMAIL, &format!(" {code}")).await.unwrap());
        assert!(!svc.validate(EMAIL, "999999x").await.unwrap());
        assert!(!svc.validate(EMAIL, "").await.unwrap());
    }

    #[tokio::test]
    async fn reset_consumes_the_code() {
        let repo = seeded_repo().await;
        let svc = service(&repo);
        let code = svc.generate(EMAIL).await.unwrap();

        svc.reset_password(EMAIL, &code, "new-password")
            .await
            .unwrap();

        let stored = repo.find_user_by_email(EMAIL).await.unwrap().unwrap();
        assert!(stored.recovery().is_none());
        assert_ne!(stored.password_hash(), "old-hash");
        assert!(stored.password_hash().starts_with("$argon2"));

        // second attempt with the same code is rejected, nothing changes
        let err = svc
            .reset_password(EMAIL, &code, "another-password")
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidCode));
    }

    #[tokio::test]
    async fn reset_with_wrong_code_changes_nothing() {
        let repo = seeded_repo().await;
        let svc = service(&repo);
        let code = svc.generate(EMAIL).await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let err = svc
            .reset_password(EMAIL, wrong, "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::InvalidCode));

        let stored = repo.find_user_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(stored.password_hash(), "old-hash");
        assert!(stored.recovery().is_some());
    }

    #[tokio::test]
    async fn regeneration_invalidates_the_previous_code() {
        let repo = seeded_repo().await;
        let svc = service(&repo);

        let first = svc.generate(EMAIL).await.unwrap();
        let second = svc.generate(EMAIL).await.unwrap();

        if first != second {
            assert!(!svc.validate(EMAIL, &first).await.unwrap());
        }
        assert!(svc.validate(EMAIL, &second).await.unwrap());
    }
}
