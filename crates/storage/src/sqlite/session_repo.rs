use chrono::{DateTime, Utc};
use sqlx::Row;

use planner_core::model::{SessionId, StudySession, SubjectId, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{SessionRepository, StorageError};

const SELECT_SESSION: &str = r"
    SELECT id, user_id, title, description, date, duration_minutes,
           completed, total_questions, correct_questions, subject_id
    FROM study_sessions
";

impl SqliteRepository {
    async fn matters_for_session(&self, session_id: i64) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            "SELECT matter FROM session_matters WHERE session_id = ?1 ORDER BY matter ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("matter").map_err(mapping::ser))
            .collect()
    }

    async fn map_session_rows(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: i64 = row.try_get("id").map_err(mapping::ser)?;
            let matters = self.matters_for_session(raw).await?;
            sessions.push(mapping::map_session_row(&row, matters)?);
        }
        Ok(sessions)
    }

    async fn fetch_sum<'a>(
        &self,
        query: sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>>,
    ) -> Result<u64, StorageError> {
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        mapping::sum_to_u64(row.try_get::<i64, _>(0).map_err(mapping::ser)?)
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn upsert_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let id = mapping::id_to_i64("session_id", session.id().value())?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO study_sessions (
                id, user_id, title, description, date, duration_minutes,
                completed, total_questions, correct_questions, subject_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                date = excluded.date,
                duration_minutes = excluded.duration_minutes,
                completed = excluded.completed,
                total_questions = excluded.total_questions,
                correct_questions = excluded.correct_questions,
                subject_id = excluded.subject_id
            ",
        )
        .bind(id)
        .bind(mapping::id_to_i64("user_id", session.user_id().value())?)
        .bind(session.title())
        .bind(session.description())
        .bind(session.date())
        .bind(i64::from(session.duration_minutes()))
        .bind(session.is_completed())
        .bind(session.total_questions().map(i64::from))
        .bind(session.correct_questions().map(i64::from))
        .bind(mapping::id_to_i64("subject_id", session.subject_id().value())?)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM session_matters WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for matter in session.matters() {
            sqlx::query("INSERT INTO session_matters (session_id, matter) VALUES (?1, ?2)")
                .bind(id)
                .bind(matter)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<StudySession>, StorageError> {
        let raw = mapping::id_to_i64("session_id", id.value())?;
        let row = sqlx::query(&format!("{SELECT_SESSION} WHERE id = ?1"))
            .bind(raw)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => {
                let matters = self.matters_for_session(raw).await?;
                Ok(Some(mapping::map_session_row(&row, matters)?))
            }
            None => Ok(None),
        }
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_SESSION} WHERE user_id = ?1 ORDER BY date DESC, id DESC"
        ))
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.map_session_rows(rows).await
    }

    async fn list_sessions_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(&format!(
            "{SELECT_SESSION} WHERE user_id = ?1 AND date >= ?2 ORDER BY date DESC, id DESC"
        ))
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.map_session_rows(rows).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM study_sessions WHERE id = ?1")
            .bind(mapping::id_to_i64("session_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn sum_minutes_by_matter(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        matter: &str,
    ) -> Result<u64, StorageError> {
        let query = sqlx::query(
            r"
            SELECT COALESCE(SUM(s.duration_minutes), 0)
            FROM study_sessions s
            JOIN session_matters m ON m.session_id = s.id
            WHERE s.user_id = ?1 AND s.subject_id = ?2 AND m.matter = ?3
            ",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(mapping::id_to_i64("subject_id", subject_id.value())?)
        .bind(matter);

        self.fetch_sum(query).await
    }

    async fn sum_minutes_by_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StorageError> {
        let query = sqlx::query(
            r"
            SELECT COALESCE(SUM(duration_minutes), 0)
            FROM study_sessions
            WHERE user_id = ?1 AND subject_id = ?2
            ",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(mapping::id_to_i64("subject_id", subject_id.value())?);

        self.fetch_sum(query).await
    }

    async fn sum_minutes_in_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let query = sqlx::query(
            r"
            SELECT COALESCE(SUM(duration_minutes), 0)
            FROM study_sessions
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(start)
        .bind(end);

        self.fetch_sum(query).await
    }

    async fn sum_questions_by_matter(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        matter: &str,
    ) -> Result<u64, StorageError> {
        let query = sqlx::query(
            r"
            SELECT COALESCE(SUM(s.total_questions), 0)
            FROM study_sessions s
            JOIN session_matters m ON m.session_id = s.id
            WHERE s.user_id = ?1 AND s.subject_id = ?2 AND m.matter = ?3
            ",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(mapping::id_to_i64("subject_id", subject_id.value())?)
        .bind(matter);

        self.fetch_sum(query).await
    }

    async fn sum_questions_by_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StorageError> {
        let query = sqlx::query(
            r"
            SELECT COALESCE(SUM(total_questions), 0)
            FROM study_sessions
            WHERE user_id = ?1 AND subject_id = ?2
            ",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(mapping::id_to_i64("subject_id", subject_id.value())?);

        self.fetch_sum(query).await
    }

    async fn sum_questions_in_range(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let query = sqlx::query(
            r"
            SELECT COALESCE(SUM(total_questions), 0)
            FROM study_sessions
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .bind(start)
        .bind(end);

        self.fetch_sum(query).await
    }

    async fn total_minutes(&self, user_id: UserId) -> Result<u64, StorageError> {
        let query = sqlx::query(
            "SELECT COALESCE(SUM(duration_minutes), 0) FROM study_sessions WHERE user_id = ?1",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?);

        self.fetch_sum(query).await
    }

    async fn count_completed_sessions(&self, user_id: UserId) -> Result<u64, StorageError> {
        let query = sqlx::query(
            "SELECT COUNT(*) FROM study_sessions WHERE user_id = ?1 AND completed = 1",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?);

        self.fetch_sum(query).await
    }
}
