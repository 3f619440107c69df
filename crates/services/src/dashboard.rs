use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;

use planner_core::Clock;
use planner_core::model::UserId;
use planner_core::time::{chart_days, chart_window_start, local_day, start_of_week};
use storage::repository::{GoalRepository, SessionRepository, UserRepository};

use crate::error::DashboardError;

/// One day on the 7-day study chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub hours: f64,
}

/// Aggregated study statistics for a user's dashboard.
///
/// Totals report whole hours (minutes floored); the chart keeps fractional
/// hours so short sessions stay visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_hours: u64,
    pub weekly_hours: u64,
    pub completed_sessions: u64,
    pub active_goals: u64,
    pub chart_data: Vec<ChartPoint>,
}

/// Computes dashboard statistics from session and goal data.
///
/// Week and day boundaries follow the configured UTC offset, so "this
/// week" means the most recent Monday 00:00 local time.
#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    offset: FixedOffset,
    users: Arc<dyn UserRepository>,
    goals: Arc<dyn GoalRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        offset: FixedOffset,
        users: Arc<dyn UserRepository>,
        goals: Arc<dyn GoalRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            offset,
            users,
            goals,
            sessions,
        }
    }

    /// Aggregate the dashboard view for a user.
    ///
    /// The chart always carries exactly seven points, oldest first, with
    /// zero-hour entries for days without sessions.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::UserNotFound` for an unknown user and
    /// `DashboardError::Storage` when repository access fails.
    pub async fn stats(&self, user_id: UserId) -> Result<DashboardStats, DashboardError> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(DashboardError::UserNotFound);
        }

        let now = self.clock.now();
        let week_start = start_of_week(now, self.offset);

        let total_minutes = self.sessions.total_minutes(user_id).await?;
        let weekly_minutes = self
            .sessions
            .sum_minutes_in_range(user_id, week_start, now)
            .await?;
        let completed_sessions = self.sessions.count_completed_sessions(user_id).await?;
        let active_goals = self.goals.count_active_goals(user_id).await?;

        let window_start = chart_window_start(now, self.offset);
        let recent = self.sessions.list_sessions_since(user_id, window_start).await?;
        let mut per_day: HashMap<NaiveDate, f64> = HashMap::new();
        for session in &recent {
            let day = local_day(session.date(), self.offset);
            *per_day.entry(day).or_insert(0.0) += f64::from(session.duration_minutes()) / 60.0;
        }

        let chart_data = chart_days(now, self.offset)
            .into_iter()
            .map(|date| ChartPoint {
                date,
                hours: per_day.get(&date).copied().unwrap_or(0.0),
            })
            .collect();

        tracing::debug!(
            user = %user_id,
            total_minutes,
            weekly_minutes,
            "computed dashboard stats"
        );

        Ok(DashboardStats {
            total_hours: total_minutes / 60,
            weekly_hours: weekly_minutes / 60,
            completed_sessions,
            active_goals,
            chart_data,
        })
    }
}
