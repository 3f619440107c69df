use sqlx::Row;

use planner_core::model::{Subject, SubjectId, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, SubjectRepository};

impl SqliteRepository {
    async fn matters_for_subject(&self, subject_id: i64) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT matter FROM subject_matters
            WHERE subject_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter()
            .map(|r| r.try_get::<String, _>("matter").map_err(mapping::ser))
            .collect()
    }
}

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let id = mapping::id_to_i64("subject_id", subject.id().value())?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO subjects (id, user_id, name, color)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                color = excluded.color
            ",
        )
        .bind(id)
        .bind(mapping::id_to_i64("user_id", subject.user_id().value())?)
        .bind(subject.name())
        .bind(subject.color())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM subject_matters WHERE subject_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, matter) in subject.matters().iter().enumerate() {
            sqlx::query(
                "INSERT INTO subject_matters (subject_id, position, matter) VALUES (?1, ?2, ?3)",
            )
            .bind(id)
            .bind(position as i64)
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

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let raw = mapping::id_to_i64("subject_id", id.value())?;
        let row = sqlx::query("SELECT id, user_id, name, color FROM subjects WHERE id = ?1")
            .bind(raw)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => {
                let matters = self.matters_for_subject(raw).await?;
                Ok(Some(mapping::map_subject_row(&row, matters)?))
            }
            None => Ok(None),
        }
    }

    async fn list_subjects(&self, user_id: UserId) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, color FROM subjects WHERE user_id = ?1 ORDER BY id ASC",
        )
        .bind(mapping::id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: i64 = row.try_get("id").map_err(mapping::ser)?;
            let matters = self.matters_for_subject(raw).await?;
            subjects.push(mapping::map_subject_row(&row, matters)?);
        }
        Ok(subjects)
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(mapping::id_to_i64("subject_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
