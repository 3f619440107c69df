use serde::Serialize;

use crate::model::goal::Goal;
use crate::model::ids::GoalId;

/// Computed progress for a goal: a read model produced per request, never
/// written back to the goal entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal_id: GoalId,
    /// Accumulated hours, rounded to one decimal for display.
    pub current_hours: f64,
    pub current_questions: u64,
    /// Integer percentage, always within 0..=100.
    pub progress_percentage: u8,
}

impl GoalProgress {
    /// Derive progress from raw aggregation sums.
    ///
    /// An hours target takes precedence over a questions target; when both
    /// are set the questions target is ignored (preserved behavior of the
    /// source system, recorded in DESIGN.md). Without any positive target
    /// the percentage is 0. The percentage is the floor of the ratio and
    /// is clamped to 100.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn from_sums(goal: &Goal, minutes_sum: u64, questions_sum: u64) -> Self {
        let hours_done = minutes_sum as f64 / 60.0;

        // Percentage works on the exact hours; only the displayed value is
        // rounded to one decimal.
        let percent = if let Some(target) = goal.target_hours().filter(|t| *t > 0.0) {
            (hours_done / target * 100.0).floor() as u64
        } else if let Some(target) = goal.target_questions().filter(|t| *t > 0) {
            (questions_sum as f64 / f64::from(target) * 100.0).floor() as u64
        } else {
            0
        };

        Self {
            goal_id: goal.id(),
            current_hours: (hours_done * 10.0).round() / 10.0,
            current_questions: questions_sum,
            progress_percentage: percent.min(100) as u8,
        }
    }
}
