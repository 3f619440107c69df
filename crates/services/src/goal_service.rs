use std::sync::Arc;

use chrono::NaiveDate;

use planner_core::model::{Goal, GoalId, GoalType, SubjectId, UserId};
use storage::repository::{GoalRepository, StorageError, SubjectRepository, UserRepository};

use crate::error::GoalServiceError;

/// Input for creating or updating a goal.
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub title: String,
    pub goal_type: GoalType,
    pub target_hours: Option<f64>,
    pub target_questions: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub subject_id: Option<SubjectId>,
    pub matter: Option<String>,
}

/// CRUD entry point for goals.
#[derive(Clone)]
pub struct GoalService {
    users: Arc<dyn UserRepository>,
    subjects: Arc<dyn SubjectRepository>,
    goals: Arc<dyn GoalRepository>,
}

impl GoalService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        subjects: Arc<dyn SubjectRepository>,
        goals: Arc<dyn GoalRepository>,
    ) -> Self {
        Self {
            users,
            subjects,
            goals,
        }
    }

    /// Create a goal for the user.
    ///
    /// A referenced subject that no longer exists degrades the goal to
    /// unscoped rather than failing the whole request.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown owner, `Goal` for invalid field
    /// values, `Storage` for repository failures.
    pub async fn create_goal(
        &self,
        id: GoalId,
        user_id: UserId,
        draft: GoalDraft,
    ) -> Result<Goal, GoalServiceError> {
        self.require_user(user_id).await?;
        let goal = self.build_goal(id, user_id, draft).await?;
        self.goals.upsert_goal(&goal).await?;
        tracing::debug!(goal = %goal.id(), user = %user_id, "created goal");
        Ok(goal)
    }

    /// Replace an existing goal owned by the user.
    ///
    /// # Errors
    ///
    /// `NotFound` when the goal does not exist or belongs to someone else,
    /// plus the failure modes of [`GoalService::create_goal`].
    pub async fn update_goal(
        &self,
        id: GoalId,
        user_id: UserId,
        draft: GoalDraft,
    ) -> Result<Goal, GoalServiceError> {
        self.require_user(user_id).await?;
        let existing = self
            .goals
            .get_goal(id)
            .await?
            .ok_or(GoalServiceError::NotFound)?;
        if existing.user_id() != user_id {
            return Err(GoalServiceError::NotFound);
        }

        let goal = self.build_goal(id, user_id, draft).await?;
        self.goals.upsert_goal(&goal).await?;
        Ok(goal)
    }

    /// # Errors
    ///
    /// `NotFound` when the goal does not exist.
    pub async fn delete_goal(&self, id: GoalId) -> Result<(), GoalServiceError> {
        match self.goals.delete_goal(id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(GoalServiceError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// List the user's active goals, ordered by ID.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown owner, `Storage` otherwise.
    pub async fn list_active_goals(&self, user_id: UserId) -> Result<Vec<Goal>, GoalServiceError> {
        self.require_user(user_id).await?;
        Ok(self.goals.list_active_goals(user_id).await?)
    }

    async fn build_goal(
        &self,
        id: GoalId,
        user_id: UserId,
        draft: GoalDraft,
    ) -> Result<Goal, GoalServiceError> {
        let subject_id = match draft.subject_id {
            Some(sid) => self.subjects.get_subject(sid).await?.map(|s| s.id()),
            None => None,
        };
        if subject_id.is_none() && draft.subject_id.is_some() {
            tracing::warn!(goal = %id, "referenced subject is gone, storing goal unscoped");
        }

        Ok(Goal::new(
            id,
            draft.title,
            draft.goal_type,
            draft.target_hours,
            draft.target_questions,
            draft.start_date,
            draft.end_date,
            draft.active,
            subject_id,
            draft.matter,
            user_id,
        )?)
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), GoalServiceError> {
        self.users
            .get_user(user_id)
            .await?
            .map(|_| ())
            .ok_or(GoalServiceError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use planner_core::model::{GoalError, Subject, User};
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> GoalService {
        GoalService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn draft(subject: Option<SubjectId>) -> GoalDraft {
        GoalDraft {
            title: "Master algebra".to_string(),
            goal_type: GoalType::Weekly,
            target_hours: Some(10.0),
            target_questions: None,
            start_date: None,
            end_date: None,
            active: true,
            subject_id: subject,
            matter: None,
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
    async fn creates_goal_for_existing_user_and_subject() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;

        let goal = service(&repo)
            .create_goal(GoalId::new(1), UserId::new(1), draft(Some(SubjectId::new(3))))
            .await
            .unwrap();
        assert_eq!(goal.subject_id(), Some(SubjectId::new(3)));
        assert!(repo.get_goal(GoalId::new(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_subject_degrades_to_unscoped() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;

        let goal = service(&repo)
            .create_goal(GoalId::new(1), UserId::new(1), draft(Some(SubjectId::new(99))))
            .await
            .unwrap();
        assert_eq!(goal.subject_id(), None);
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = service(&repo)
            .create_goal(GoalId::new(1), UserId::new(404), draft(None))
            .await
            .unwrap_err();
        assert!(matches!(err, GoalServiceError::UserNotFound));
    }

    #[tokio::test]
    async fn invalid_target_hours_propagate_as_goal_error() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;

        let mut bad = draft(None);
        bad.target_hours = Some(0.0);
        let err = service(&repo)
            .create_goal(GoalId::new(1), UserId::new(1), bad)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GoalServiceError::Goal(GoalError::InvalidTargetHours(_))
        ));
    }

    #[tokio::test]
    async fn update_rejects_foreign_goal() {
        let repo = InMemoryRepository::new();
        seed(&repo).await;
        let other = User::new(UserId::new(2), "Bea", "bea@example.com", "hash").unwrap();
        UserRepository::upsert_user(&repo, &other).await.unwrap();

        let svc = service(&repo);
        svc.create_goal(GoalId::new(1), UserId::new(1), draft(None))
            .await
            .unwrap();

        let err = svc
            .update_goal(GoalId::new(1), UserId::new(2), draft(None))
            .await
            .unwrap_err();
        assert!(matches!(err, GoalServiceError::NotFound));
    }

    #[tokio::test]
    async fn delete_missing_goal_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = service(&repo).delete_goal(GoalId::new(404)).await.unwrap_err();
        assert!(matches!(err, GoalServiceError::NotFound));
    }
}
