use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use planner_core::Clock;
use planner_core::model::{SessionId, StudySession, SubjectId, UserId};
use planner_core::time::start_of_day;
use storage::repository::{SessionRepository, StorageError, SubjectRepository, UserRepository};

use crate::error::SessionServiceError;

/// How far back `list_recent_sessions` looks.
const RECENT_WINDOW_DAYS: i64 = 7;

/// Input for logging or updating a study session.
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub completed: bool,
    pub total_questions: Option<u32>,
    pub correct_questions: Option<u32>,
    pub subject_id: SubjectId,
    pub matters: Vec<String>,
}

/// CRUD entry point for study sessions.
///
/// Sessions may be logged for any past instant but never for a future
/// calendar day.
#[derive(Clone)]
pub struct SessionService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    subjects: Arc<dyn SubjectRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        subjects: Arc<dyn SubjectRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            subjects,
            sessions,
        }
    }

    /// Log a session for the user.
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `SubjectNotFound` for missing parents,
    /// `FutureDate` when the session's calendar day lies after today,
    /// `Session` for invalid field values, `Storage` otherwise.
    pub async fn create_session(
        &self,
        id: SessionId,
        user_id: UserId,
        draft: SessionDraft,
    ) -> Result<StudySession, SessionServiceError> {
        self.require_user(user_id).await?;
        let session = self.build_session(id, user_id, draft).await?;
        self.sessions.upsert_session(&session).await?;
        tracing::debug!(session = %session.id(), user = %user_id, "logged session");
        Ok(session)
    }

    /// Replace an existing session owned by the user.
    ///
    /// # Errors
    ///
    /// `NotFound` when the session does not exist or belongs to someone
    /// else, plus the failure modes of [`SessionService::create_session`].
    pub async fn update_session(
        &self,
        id: SessionId,
        user_id: UserId,
        draft: SessionDraft,
    ) -> Result<StudySession, SessionServiceError> {
        self.require_user(user_id).await?;
        let existing = self
            .sessions
            .get_session(id)
            .await?
            .ok_or(SessionServiceError::NotFound)?;
        if existing.user_id() != user_id {
            return Err(SessionServiceError::NotFound);
        }

        let session = self.build_session(id, user_id, draft).await?;
        self.sessions.upsert_session(&session).await?;
        Ok(session)
    }

    /// # Errors
    ///
    /// `NotFound` when the session does not exist.
    pub async fn delete_session(&self, id: SessionId) -> Result<(), SessionServiceError> {
        match self.sessions.delete_session(id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(SessionServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// All sessions for the user, newest first.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown owner, `Storage` otherwise.
    pub async fn list_sessions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StudySession>, SessionServiceError> {
        self.require_user(user_id).await?;
        Ok(self.sessions.list_sessions(user_id).await?)
    }

    /// Sessions from the last seven days, counted from the start of the
    /// day seven days ago.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown owner, `Storage` otherwise.
    pub async fn list_recent_sessions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<StudySession>, SessionServiceError> {
        self.require_user(user_id).await?;
        let since =
            start_of_day((self.clock.now() - Duration::days(RECENT_WINDOW_DAYS)).date_naive());
        Ok(self.sessions.list_sessions_since(user_id, since).await?)
    }

    async fn build_session(
        &self,
        id: SessionId,
        user_id: UserId,
        draft: SessionDraft,
    ) -> Result<StudySession, SessionServiceError> {
        if self.subjects.get_subject(draft.subject_id).await?.is_none() {
            return Err(SessionServiceError::SubjectNotFound);
        }
        // future dates are rejected at calendar-day granularity: later
        // today is fine, tomorrow is not
        if draft.date.date_naive() > self.clock.now().date_naive() {
            return Err(SessionServiceError::FutureDate);
        }

        Ok(StudySession::new(
            id,
            draft.title,
            draft.description,
            draft.date,
            draft.duration_minutes,
            draft.completed,
            draft.total_questions,
            draft.correct_questions,
            draft.subject_id,
            draft.matters,
            user_id,
        )?)
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), SessionServiceError> {
        self.users
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(SessionServiceError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use planner_core::model::{StudySessionError, Subject, User};
    use planner_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> SessionService {
        SessionService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn draft(date: DateTime<Utc>, minutes: u32) -> SessionDraft {
        SessionDraft {
            title: "Evening drill".to_string(),
            description: None,
            date,
            duration_minutes: minutes,
            completed: true,
            total_questions: Some(10),
            correct_questions: Some(8),
            subject_id: SubjectId::new(3),
            matters: vec!["Algebra".to_string()],
        }
    }

    async fn seed(repo: &InMemoryRepository) {
        let user = User::new(UserId::new(1), "Ana", "ana@example.com", "hash").unwrap();
        UserRepository::upsert_user(repo, &user).await.unwrap();
        let subject = Subject::new(
            SubjectId::new(3),
            "Math",
            "#2d6cdf",
            vec!["Algebra".to_string()],
            UserId::new(1),
        )
        .unwrap();
        SubjectRepository::upsert_subject(repo, &subject)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn logs_a_session_today() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;

        let session = service(&repo)
            .create_session(SessionId::new(1), UserId::new(1), draft(fixed_now(), 90))
            .await
            .unwrap();
        assert_eq!(session.duration_minutes(), 90);
        assert!(repo.get_session(SessionId::new(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rejects_future_calendar_day_but_allows_later_today() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;
        let svc = service(&repo);

        // fixed_now is 22:13:20 UTC; an hour later is still today
        svc.create_session(
            SessionId::new(1),
            UserId::new(1),
            draft(fixed_now() + Duration::hours(1), 30),
        )
        .await
        .unwrap();

        let err = svc
            .create_session(
                SessionId::new(2),
                UserId::new(1),
                draft(fixed_now() + Duration::days(1), 30),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionServiceError::FutureDate));
    }

    #[tokio::test]
    async fn rejects_unknown_subject() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;

        let mut bad = draft(fixed_now(), 30);
        bad.subject_id = SubjectId::new(99);
        let err = service(&repo)
            .create_session(SessionId::new(1), UserId::new(1), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionServiceError::SubjectNotFound));
    }

    #[tokio::test]
    async fn invalid_duration_propagates_as_session_error() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;

        let err = service(&repo)
            .create_session(SessionId::new(1), UserId::new(1), draft(fixed_now(), 2000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionServiceError::Session(StudySessionError::DurationOutOfRange(2000))
        ));
    }

    #[tokio::test]
    async fn recent_sessions_cover_the_last_seven_days() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;
        let svc = service(&repo);

        svc.create_session(
            SessionId::new(1),
            UserId::new(1),
            draft(fixed_now() - Duration::days(2), 30),
        )
        .await
        .unwrap();
        svc.create_session(
            SessionId::new(2),
            UserId::new(1),
            draft(fixed_now() - Duration::days(10), 30),
        )
        .await
        .unwrap();

        let recent = svc.list_recent_sessions(UserId::new(1)).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id(), SessionId::new(1));
    }

    #[tokio::test]
    async fn update_rejects_foreign_session() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;
        let other = User::new(UserId::new(2), "Bea", "bea@example.com", "hash").unwrap();
        UserRepository::upsert_user(&repo, &other).await.unwrap();

        let svc = service(&repo);
        svc.create_session(SessionId::new(1), UserId::new(1), draft(fixed_now(), 30))
            .await
            .unwrap();

        let err = svc
            .update_session(SessionId::new(1), UserId::new(2), draft(fixed_now(), 45))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionServiceError::NotFound));
    }
}
