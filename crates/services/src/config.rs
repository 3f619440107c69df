//! Application configuration loaded from environment variables at startup.
//!
//! A `.env` file is honored for local development; tests go through
//! [`Config::from_lookup`] so they never touch the process environment.

use chrono::FixedOffset;
use thiserror::Error;

/// Default dashboard offset: UTC-3, the zone the dashboard week and chart
/// were originally defined in.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = -180;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing the environment variable {0}")]
    MissingVar(String),
    #[error("invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Offset applied when bucketing dashboard stats into calendar days
    /// and weeks.
    pub dashboard_offset: FixedOffset,
}

impl Config {
    /// Loads configuration from environment variables, reading a `.env`
    /// file first when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` when `DATABASE_URL` is absent, or
    /// `ConfigError::InvalidValue` for an unparsable offset.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through the given lookup function.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let offset_minutes = match lookup("DASHBOARD_UTC_OFFSET_MINUTES") {
            Some(raw) => raw.parse::<i32>().map_err(|e| {
                ConfigError::InvalidValue("DASHBOARD_UTC_OFFSET_MINUTES".to_string(), e.to_string())
            })?,
            None => DEFAULT_UTC_OFFSET_MINUTES,
        };
        let dashboard_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            ConfigError::InvalidValue(
                "DASHBOARD_UTC_OFFSET_MINUTES".to_string(),
                format!("{offset_minutes} is out of range"),
            )
        })?;

        Ok(Self {
            database_url,
            dashboard_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn requires_database_url() {
        let err = Config::from_lookup(vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(v) if v == "DATABASE_URL"));
    }

    #[test]
    fn defaults_to_utc_minus_three() {
        let config = Config::from_lookup(vars(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config.dashboard_offset.local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn parses_custom_offset() {
        let config = Config::from_lookup(vars(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DASHBOARD_UTC_OFFSET_MINUTES", "120"),
        ]))
        .unwrap();
        assert_eq!(config.dashboard_offset.local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let err = Config::from_lookup(vars(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DASHBOARD_UTC_OFFSET_MINUTES", "100000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }
}
