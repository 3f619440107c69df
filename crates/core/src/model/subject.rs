use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SubjectId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,
}

/// A named study discipline containing a set of topics ("matters").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    id: SubjectId,
    name: String,
    color: String,
    matters: Vec<String>,
    user_id: UserId,
}

impl Subject {
    /// Create a subject with a validated name.
    ///
    /// Matters are trimmed; blank entries and duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` if the name is blank after trimming.
    pub fn new(
        id: SubjectId,
        name: impl Into<String>,
        color: impl Into<String>,
        matters: Vec<String>,
        user_id: UserId,
    ) -> Result<Self, SubjectError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            color: color.into(),
            matters: normalize_matters(matters),
            user_id,
        })
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn matters(&self) -> &[String] {
        &self.matters
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Trim matter strings, dropping blanks and duplicates while preserving order.
pub(crate) fn normalize_matters(matters: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(matters.len());
    for matter in matters {
        let trimmed = matter.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.iter().any(|m| m == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        let err = Subject::new(SubjectId::new(1), "  ", "#fff", vec![], UserId::new(1));
        assert_eq!(err.unwrap_err(), SubjectError::EmptyName);
    }

    #[test]
    fn trims_name_and_matters() {
        let subject = Subject::new(
            SubjectId::new(1),
            " Math ",
            "#2d6cdf",
            vec![" Algebra ".to_string(), "".to_string(), "Algebra".to_string()],
            UserId::new(1),
        )
        .unwrap();

        assert_eq!(subject.name(), "Math");
        assert_eq!(subject.matters(), ["Algebra"]);
    }
}
