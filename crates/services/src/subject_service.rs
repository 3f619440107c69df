use std::sync::Arc;

use planner_core::model::{Subject, SubjectId, UserId};
use storage::repository::{StorageError, SubjectRepository, UserRepository};

use crate::error::SubjectServiceError;

/// CRUD entry point for subjects and their matter lists.
#[derive(Clone)]
pub struct SubjectService {
    users: Arc<dyn UserRepository>,
    subjects: Arc<dyn SubjectRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, subjects: Arc<dyn SubjectRepository>) -> Self {
        Self { users, subjects }
    }

    /// Create a subject for the user. Matters are trimmed and deduplicated
    /// by the domain constructor.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown owner, `Subject` for invalid field
    /// values, `Storage` otherwise.
    pub async fn create_subject(
        &self,
        id: SubjectId,
        user_id: UserId,
        name: &str,
        color: &str,
        matters: Vec<String>,
    ) -> Result<Subject, SubjectServiceError> {
        self.require_user(user_id).await?;
        let subject = Subject::new(id, name, color, matters, user_id)?;
        self.subjects.upsert_subject(&subject).await?;
        tracing::debug!(subject = %subject.id(), user = %user_id, "created subject");
        Ok(subject)
    }

    /// Replace an existing subject owned by the user.
    ///
    /// # Errors
    ///
    /// `NotFound` when the subject does not exist or belongs to someone
    /// else, plus the failure modes of [`SubjectService::create_subject`].
    pub async fn update_subject(
        &self,
        id: SubjectId,
        user_id: UserId,
        name: &str,
        color: &str,
        matters: Vec<String>,
    ) -> Result<Subject, SubjectServiceError> {
        self.require_user(user_id).await?;
        let existing = self
            .subjects
            .get_subject(id)
            .await?
            .ok_or(SubjectServiceError::NotFound)?;
        if existing.user_id() != user_id {
            return Err(SubjectServiceError::NotFound);
        }

        let subject = Subject::new(id, name, color, matters, user_id)?;
        self.subjects.upsert_subject(&subject).await?;
        Ok(subject)
    }

    /// # Errors
    ///
    /// `NotFound` when the subject does not exist.
    pub async fn delete_subject(&self, id: SubjectId) -> Result<(), SubjectServiceError> {
        match self.subjects.delete_subject(id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(SubjectServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// All subjects owned by the user, ordered by ID.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown owner, `Storage` otherwise.
    pub async fn list_subjects(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subject>, SubjectServiceError> {
        self.require_user(user_id).await?;
        Ok(self.subjects.list_subjects(user_id).await?)
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), SubjectServiceError> {
        self.users
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(SubjectServiceError::UserNotFound)
    }
}
