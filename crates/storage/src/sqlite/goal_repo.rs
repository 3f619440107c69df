use sqlx::Row;

use planner_core::model::{Goal, GoalId, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{GoalRepository, StorageError};

const SELECT_GOAL: &str = r"
    SELECT id, user_id, title, goal_type, target_hours, target_questions,
           start_date, end_date, active, subject_id, matter
    FROM goals
";

#[async_trait::async_trait]
impl GoalRepository for SqliteRepository {
    async fn upsert_goal(&self, goal: &Goal) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO goals (
                id, user_id, title, goal_type, target_hours, target_questions,
                start_date, end_date, active, subject_id, matter
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                goal_type = excluded.goal_type,
                target_hours = excluded.target_hours,
                target_questions = excluded.target_questions,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                active = excluded.active,
                subject_id = excluded.subject_id,
                matter = excluded.matter
            ",
        )
        .bind(mapping::id_to_i64("goal_id", goal.id().value())?)
        .bind(mapping::id_to_i64("user_id", goal.user_id().value())?)
        .bind(goal.title())
        .bind(goal.goal_type().as_str())
        .bind(goal.target_hours())
        .bind(goal.target_questions().map(i64::from))
        .bind(goal.start_date())
        .bind(goal.end_date())
        .bind(goal.is_active())
        .bind(
            goal.subject_id()
                .map(|s| mapping::id_to_i64("subject_id", s.value()))
                .transpose()?,
        )
        .bind(goal.matter())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_goal(&self, id: GoalId) -> Result<Option<Goal>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_GOAL} WHERE id = ?1"))
            .bind(mapping::id_to_i64("goal_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_goal_row(&r)).transpose()
    }

    async fn list_active_goals(&self, user_id: UserId) -> Result<Vec<Goal>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_GOAL} WHERE user_id = ?1 AND active = 1 ORDER BY id ASC"
        ))
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_goal_row).collect()
    }

    async fn count_active_goals(&self, user_id: UserId) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM goals WHERE user_id = ?1 AND active = 1")
            .bind(mapping::id_to_i64("user_id", user_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        mapping::sum_to_u64(row.try_get::<i64, _>("n").map_err(mapping::ser)?)
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM goals WHERE id = ?1")
            .bind(mapping::id_to_i64("goal_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
