use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use planner_core::model::{
    Goal, GoalId, GoalType, RecoveryCode, SessionId, StudySession, Subject, SubjectId, User,
    UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn goal_id_from_i64(v: i64) -> Result<GoalId, StorageError> {
    Ok(GoalId::new(i64_to_u64("goal_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn sum_to_u64(v: i64) -> Result<u64, StorageError> {
    i64_to_u64("aggregate sum", v)
}

pub(crate) fn parse_goal_type(s: &str) -> Result<GoalType, StorageError> {
    match s {
        "weekly" => Ok(GoalType::Weekly),
        "monthly" => Ok(GoalType::Monthly),
        "custom" => Ok(GoalType::Custom),
        _ => Err(StorageError::Serialization(format!("invalid goal type: {s}"))),
    }
}

fn opt_u32(row: &sqlx::sqlite::SqliteRow, col: &str) -> Result<Option<u32>, StorageError> {
    row.try_get::<Option<i64>, _>(col)
        .map_err(ser)?
        .map(|v| u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {col}: {v}"))))
        .transpose()
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    let recovery_code: Option<String> = row.try_get("recovery_code").map_err(ser)?;
    let recovery_expires_at: Option<DateTime<Utc>> =
        row.try_get("recovery_expires_at").map_err(ser)?;

    // Schema-level CHECK keeps these in lockstep; a mismatch means the row
    // was tampered with outside the application.
    let recovery = match (recovery_code, recovery_expires_at) {
        (Some(code), Some(expires_at)) => Some(RecoveryCode::new(code, expires_at)),
        (None, None) => None,
        _ => {
            return Err(StorageError::Serialization(
                "recovery code and expiry out of sync".into(),
            ));
        }
    };

    User::from_persisted(
        user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("email").map_err(ser)?,
        row.try_get::<String, _>("password_hash").map_err(ser)?,
        recovery,
    )
    .map_err(ser)
}

pub(crate) fn map_subject_row(
    row: &sqlx::sqlite::SqliteRow,
    matters: Vec<String>,
) -> Result<Subject, StorageError> {
    Subject::new(
        subject_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("color").map_err(ser)?,
        matters,
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_goal_row(row: &sqlx::sqlite::SqliteRow) -> Result<Goal, StorageError> {
    let goal_type_str: String = row.try_get("goal_type").map_err(ser)?;

    Goal::new(
        goal_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        parse_goal_type(&goal_type_str)?,
        row.try_get::<Option<f64>, _>("target_hours").map_err(ser)?,
        opt_u32(row, "target_questions")?,
        row.try_get::<Option<NaiveDate>, _>("start_date").map_err(ser)?,
        row.try_get::<Option<NaiveDate>, _>("end_date").map_err(ser)?,
        row.try_get::<bool, _>("active").map_err(ser)?,
        row.try_get::<Option<i64>, _>("subject_id")
            .map_err(ser)?
            .map(subject_id_from_i64)
            .transpose()?,
        row.try_get::<Option<String>, _>("matter").map_err(ser)?,
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
    matters: Vec<String>,
) -> Result<StudySession, StorageError> {
    let duration_i64: i64 = row.try_get("duration_minutes").map_err(ser)?;
    let duration = u32::try_from(duration_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid duration: {duration_i64}")))?;

    StudySession::new(
        session_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<DateTime<Utc>, _>("date").map_err(ser)?,
        duration,
        row.try_get::<bool, _>("completed").map_err(ser)?,
        opt_u32(row, "total_questions")?,
        opt_u32(row, "correct_questions")?,
        subject_id_from_i64(row.try_get("subject_id").map_err(ser)?)?,
        matters,
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
    )
    .map_err(ser)
}
