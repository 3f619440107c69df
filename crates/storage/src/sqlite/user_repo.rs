use planner_core::model::{User, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, UserRepository};

const SELECT_USER: &str = r"
    SELECT id, name, email, password_hash, recovery_code, recovery_expires_at
    FROM users
";

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, password_hash, recovery_code, recovery_expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                password_hash = excluded.password_hash,
                recovery_code = excluded.recovery_code,
                recovery_expires_at = excluded.recovery_expires_at
            ",
        )
        .bind(mapping::id_to_i64("user_id", user.id().value())?)
        .bind(user.name())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.recovery().map(|r| r.code().to_owned()))
        .bind(user.recovery().map(planner_core::model::RecoveryCode::expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(mapping::id_to_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_user_row(&r)).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_user_row(&r)).transpose()
    }
}
