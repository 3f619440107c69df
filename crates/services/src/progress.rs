use std::sync::Arc;

use planner_core::Clock;
use planner_core::model::{Goal, GoalProgress, ProgressTier, UserId};
use storage::repository::{GoalRepository, SessionRepository};

use crate::error::ProgressError;

/// Resolves goal progress by dispatching on the goal's aggregation tier.
///
/// The resolver is a pure read: it queries session sums and derives a
/// `GoalProgress` view without touching the goal entity, so calling it
/// twice on unchanged data yields identical output.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    goals: Arc<dyn GoalRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        goals: Arc<dyn GoalRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            goals,
            sessions,
        }
    }

    /// Compute the progress view for a single goal.
    ///
    /// Tier precedence is matter > subject > date range; a goal without a
    /// subject or start date reports zero sums. Absent session data is not
    /// an error, it degrades to zero.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn resolve(&self, goal: &Goal) -> Result<GoalProgress, ProgressError> {
        let user = goal.user_id();
        let (minutes, questions) = match goal.progress_tier(self.clock.now()) {
            ProgressTier::Matter { subject, matter } => (
                self.sessions
                    .sum_minutes_by_matter(user, subject, &matter)
                    .await?,
                self.sessions
                    .sum_questions_by_matter(user, subject, &matter)
                    .await?,
            ),
            ProgressTier::Subject(subject) => (
                self.sessions.sum_minutes_by_subject(user, subject).await?,
                self.sessions.sum_questions_by_subject(user, subject).await?,
            ),
            ProgressTier::DateRange { start, end } => (
                self.sessions.sum_minutes_in_range(user, start, end).await?,
                self.sessions
                    .sum_questions_in_range(user, start, end)
                    .await?,
            ),
            ProgressTier::Unscoped => (0, 0),
        };

        Ok(GoalProgress::from_sums(goal, minutes, questions))
    }

    /// Resolve progress for every active goal of a user, ordered by goal ID.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when repository access fails.
    pub async fn resolve_active_goals(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(Goal, GoalProgress)>, ProgressError> {
        let goals = self.goals.list_active_goals(user_id).await?;
        let mut resolved = Vec::with_capacity(goals.len());
        for goal in goals {
            let progress = self.resolve(&goal).await?;
            resolved.push((goal, progress));
        }
        tracing::debug!(user = %user_id, goals = resolved.len(), "resolved active goals");
        Ok(resolved)
    }
}
