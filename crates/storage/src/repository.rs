use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use planner_core::model::{
    Goal, GoalId, SessionId, StudySession, Subject, SubjectId, User, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist or update a user, including recovery state and password hash.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// Fetch a user by ID. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Fetch a user by email. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;
}

/// Repository contract for subjects.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Persist or update a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Fetch a subject by ID. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError>;

    /// List a user's subjects ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_subjects(&self, user_id: UserId) -> Result<Vec<Subject>, StorageError>;

    /// Delete a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError>;
}

/// Repository contract for goals.
#[async_trait]
pub trait GoalRepository: Send + Sync {
    /// Persist or update a goal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the goal cannot be stored.
    async fn upsert_goal(&self, goal: &Goal) -> Result<(), StorageError>;

    /// Fetch a goal by ID. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError>;

    /// List a user's active goals ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_active_goals(&self, user_id: UserId) -> Result<Vec<Goal>, StorageError>;

    /// Count a user's active goals.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_active_goals(&self, user_id: UserId) -> Result<u64, StorageError>;

    /// Delete a goal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the goal does not exist.
    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError>;
}

/// Repository contract for study sessions, including the aggregation
/// queries that back goal progress and the dashboard.
///
/// Every `sum_*`/`count_*` query returns 0 (never an error) when no rows
/// match. Range bounds are inclusive on both ends.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist or update a session with its matter tags.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn upsert_session(&self, session: &StudySession) -> Result<(), StorageError>;

    /// Fetch a session by ID. Returns `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<StudySession>, StorageError>;

    /// List a user's sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<StudySession>, StorageError>;

    /// List a user's sessions dated at or after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError>;

    /// Delete a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError>;

    /// Sum of minutes for sessions of a subject carrying the given matter tag.
    async fn sum_minutes_by_matter(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        matter: &str,
    ) -> Result<u64, StorageError>;

    /// Sum of minutes for all sessions of a subject.
    async fn sum_minutes_by_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StorageError>;

    /// Sum of minutes for sessions dated within `[start, end]`.
    async fn sum_minutes_in_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Sum of total questions for sessions of a subject carrying the matter tag.
    async fn sum_questions_by_matter(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        matter: &str,
    ) -> Result<u64, StorageError>;

    /// Sum of total questions for all sessions of a subject.
    async fn sum_questions_by_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StorageError>;

    /// Sum of total questions for sessions dated within `[start, end]`.
    async fn sum_questions_in_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Sum of minutes across all of a user's sessions.
    async fn total_minutes(&self, user_id: UserId) -> Result<u64, StorageError>;

    /// Count of sessions flagged completed.
    async fn count_completed_sessions(&self, user_id: UserId) -> Result<u64, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    subjects: Arc<Mutex<HashMap<SubjectId, Subject>>>,
    goals: Arc<Mutex<HashMap<GoalId, Goal>>>,
    sessions: Arc<Mutex<HashMap<SessionId, StudySession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sum_sessions<F>(&self, filter: F, questions: bool) -> Result<u64, StorageError>
    where
        F: Fn(&StudySession) -> bool,
    {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let sum = guard
            .values()
            .filter(|s| filter(s))
            .map(|s| {
                if questions {
                    u64::from(s.total_questions().unwrap_or(0))
                } else {
                    u64::from(s.duration_minutes())
                }
            })
            .sum();
        Ok(sum)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(user.id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().find(|u| u.email() == email).cloned())
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = self
            .subjects
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let guard = self
            .subjects
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_subjects(&self, user_id: UserId) -> Result<Vec<Subject>, StorageError> {
        let guard = self
            .subjects
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut subjects: Vec<Subject> = guard
            .values()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect();
        subjects.sort_by_key(Subject::id);
        Ok(subjects)
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let mut guard = self
            .subjects
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl GoalRepository for InMemoryRepository {
    async fn upsert_goal(&self, goal: &Goal) -> Result<(), StorageError> {
        let mut guard = self
            .goals
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(goal.id(), goal.clone());
        Ok(())
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError> {
        let guard = self
            .goals
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_active_goals(&self, user_id: UserId) -> Result<Vec<Goal>, StorageError> {
        let guard = self
            .goals
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut goals: Vec<Goal> = guard
            .values()
            .filter(|g| g.user_id() == user_id && g.is_active())
            .cloned()
            .collect();
        goals.sort_by_key(Goal::id);
        Ok(goals)
    }

    async fn count_active_goals(&self, user_id: UserId) -> Result<u64, StorageError> {
        let guard = self
            .goals
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|g| g.user_id() == user_id && g.is_active())
            .count() as u64)
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError> {
        let mut guard = self
            .goals
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn upsert_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<StudySession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<StudySession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut sessions: Vec<StudySession> = guard
            .values()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse((s.date(), s.id())));
        Ok(sessions)
    }

    async fn list_sessions_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let mut sessions = self.list_sessions(user_id).await?;
        sessions.retain(|s| s.date() >= since);
        Ok(sessions)
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn sum_minutes_by_matter(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        matter: &str,
    ) -> Result<u64, StorageError> {
        self.sum_sessions(
            |s| s.user_id() == user_id && s.subject_id() == subject_id && s.has_matter(matter),
            false,
        )
    }

    async fn sum_minutes_by_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StorageError> {
        self.sum_sessions(
            |s| s.user_id() == user_id && s.subject_id() == subject_id,
            false,
        )
    }

    async fn sum_minutes_in_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.sum_sessions(
            |s| s.user_id() == user_id && s.date() >= start && s.date() <= end,
            false,
        )
    }

    async fn sum_questions_by_matter(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        matter: &str,
    ) -> Result<u64, StorageError> {
        self.sum_sessions(
            |s| s.user_id() == user_id && s.subject_id() == subject_id && s.has_matter(matter),
            true,
        )
    }

    async fn sum_questions_by_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StorageError> {
        self.sum_sessions(
            |s| s.user_id() == user_id && s.subject_id() == subject_id,
            true,
        )
    }

    async fn sum_questions_in_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.sum_sessions(
            |s| s.user_id() == user_id && s.date() >= start && s.date() <= end,
            true,
        )
    }

    async fn total_minutes(&self, user_id: UserId) -> Result<u64, StorageError> {
        self.sum_sessions(|s| s.user_id() == user_id, false)
    }

    async fn count_completed_sessions(&self, user_id: UserId) -> Result<u64, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|s| s.user_id() == user_id && s.is_completed())
            .count() as u64)
    }
}

/// Aggregates the four repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
    pub goals: Arc<dyn GoalRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            subjects: Arc::new(repo.clone()),
            goals: Arc::new(repo.clone()),
            sessions: Arc::new(repo),
        }
    }
}
