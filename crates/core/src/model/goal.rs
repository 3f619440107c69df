use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{GoalId, SubjectId, UserId};
use crate::time::{end_of_day, start_of_day};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GoalError {
    #[error("goal title cannot be empty")]
    EmptyTitle,

    #[error("target hours must be > 0 when set, got {0}")]
    InvalidTargetHours(f64),

    #[error("target questions must be > 0 when set")]
    InvalidTargetQuestions,

    #[error("end date must not be before start date")]
    InvalidDateRange,
}

//
// ─── GOAL ──────────────────────────────────────────────────────────────────────
//

/// Cadence of a goal, carried for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalType {
    Weekly,
    Monthly,
    Custom,
}

impl GoalType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Weekly => "weekly",
            GoalType::Monthly => "monthly",
            GoalType::Custom => "custom",
        }
    }
}

/// The aggregation scope backing a goal's progress, in precedence order:
/// matter beats subject beats date range. A goal with neither a subject
/// nor a start date has no scope and always reports zero progress.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressTier {
    Matter { subject: SubjectId, matter: String },
    Subject(SubjectId),
    DateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Unscoped,
}

/// A user-defined study target scoped to a subject, a matter within a
/// subject, or a date range.
///
/// Progress is never stored on the goal; see `GoalProgress` for the
/// computed read model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    id: GoalId,
    title: String,
    goal_type: GoalType,
    target_hours: Option<f64>,
    target_questions: Option<u32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    active: bool,
    subject_id: Option<SubjectId>,
    matter: Option<String>,
    user_id: UserId,
}

impl Goal {
    /// Create a validated goal.
    ///
    /// The matter string is trimmed; an all-whitespace matter is treated
    /// as absent, so it can never shadow the subject tier.
    ///
    /// # Errors
    ///
    /// Returns `GoalError` when the title is blank, a target is set but
    /// not positive, or the end date precedes the start date.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: GoalId,
        title: impl Into<String>,
        goal_type: GoalType,
        target_hours: Option<f64>,
        target_questions: Option<u32>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        active: bool,
        subject_id: Option<SubjectId>,
        matter: Option<String>,
        user_id: UserId,
    ) -> Result<Self, GoalError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(GoalError::EmptyTitle);
        }
        if let Some(hours) = target_hours {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(GoalError::InvalidTargetHours(hours));
            }
        }
        if target_questions == Some(0) {
            return Err(GoalError::InvalidTargetQuestions);
        }
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(GoalError::InvalidDateRange);
            }
        }

        let matter = matter
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(Self {
            id,
            title,
            goal_type,
            target_hours,
            target_questions,
            start_date,
            end_date,
            active,
            subject_id,
            matter,
            user_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> GoalId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn goal_type(&self) -> GoalType {
        self.goal_type
    }

    #[must_use]
    pub fn target_hours(&self) -> Option<f64> {
        self.target_hours
    }

    #[must_use]
    pub fn target_questions(&self) -> Option<u32> {
        self.target_questions
    }

    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject_id
    }

    #[must_use]
    pub fn matter(&self) -> Option<&str> {
        self.matter.as_deref()
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Select the aggregation tier for this goal, first match wins:
    /// subject + matter, then subject alone, then start date, then none.
    ///
    /// For the date-range tier, a missing end date means "up to `now`".
    #[must_use]
    pub fn progress_tier(&self, now: DateTime<Utc>) -> ProgressTier {
        match (self.subject_id, self.matter.as_deref(), self.start_date) {
            (Some(subject), Some(matter), _) => ProgressTier::Matter {
                subject,
                matter: matter.to_string(),
            },
            (Some(subject), None, _) => ProgressTier::Subject(subject),
            (None, _, Some(start)) => ProgressTier::DateRange {
                start: start_of_day(start),
                end: self.end_date.map_or(now, end_of_day),
            },
            (None, _, None) => ProgressTier::Unscoped,
        }
    }
}
