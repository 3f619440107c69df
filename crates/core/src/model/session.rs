use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SessionId, SubjectId, UserId};
use crate::model::subject::normalize_matters;

/// Longest recordable session: 24 hours.
pub const MAX_SESSION_MINUTES: u32 = 1440;

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("session title cannot be empty")]
    EmptyTitle,

    #[error("session title cannot exceed {MAX_TITLE_LEN} characters")]
    TitleTooLong,

    #[error("session description cannot exceed {MAX_DESCRIPTION_LEN} characters")]
    DescriptionTooLong,

    #[error("session duration cannot exceed {MAX_SESSION_MINUTES} minutes, got {0}")]
    DurationOutOfRange(u32),

    #[error("correct questions ({correct}) cannot exceed total questions ({total})")]
    QuestionCountMismatch { correct: u32, total: u32 },
}

/// A logged interval of study time, optionally tagged with matters and
/// quiz results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    id: SessionId,
    title: String,
    description: Option<String>,
    date: DateTime<Utc>,
    duration_minutes: u32,
    completed: bool,
    total_questions: Option<u32>,
    correct_questions: Option<u32>,
    subject_id: SubjectId,
    matters: Vec<String>,
    user_id: UserId,
}

impl StudySession {
    /// Create a validated study session.
    ///
    /// Matters are trimmed and deduplicated. Future-dated rejection is a
    /// service-level concern since it needs a clock.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError` for blank/oversized text fields, a
    /// duration above 24 hours, or correct questions exceeding the total.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SessionId,
        title: impl Into<String>,
        description: Option<String>,
        date: DateTime<Utc>,
        duration_minutes: u32,
        completed: bool,
        total_questions: Option<u32>,
        correct_questions: Option<u32>,
        subject_id: SubjectId,
        matters: Vec<String>,
        user_id: UserId,
    ) -> Result<Self, StudySessionError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(StudySessionError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(StudySessionError::TitleTooLong);
        }
        if let Some(desc) = &description {
            if desc.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(StudySessionError::DescriptionTooLong);
            }
        }
        if duration_minutes > MAX_SESSION_MINUTES {
            return Err(StudySessionError::DurationOutOfRange(duration_minutes));
        }
        if let (Some(correct), Some(total)) = (correct_questions, total_questions) {
            if correct > total {
                return Err(StudySessionError::QuestionCountMismatch { correct, total });
            }
        }

        Ok(Self {
            id,
            title,
            description,
            date,
            duration_minutes,
            completed,
            total_questions,
            correct_questions,
            subject_id,
            matters: normalize_matters(matters),
            user_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn total_questions(&self) -> Option<u32> {
        self.total_questions
    }

    #[must_use]
    pub fn correct_questions(&self) -> Option<u32> {
        self.correct_questions
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn matters(&self) -> &[String] {
        &self.matters
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// True if the session carries the given matter tag (exact match on
    /// the trimmed form).
    #[must_use]
    pub fn has_matter(&self, matter: &str) -> bool {
        self.matters.iter().any(|m| m == matter)
    }
}
