#![forbid(unsafe_code)]

pub mod config;
pub mod dashboard;
pub mod error;
pub mod goal_service;
pub mod progress;
pub mod recovery;
pub mod session_service;
pub mod subject_service;

pub use planner_core::Clock;

pub use config::{Config, ConfigError};
pub use dashboard::{ChartPoint, DashboardService, DashboardStats};
pub use error::{
    DashboardError, GoalServiceError, ProgressError, RecoveryError, SessionServiceError,
    SubjectServiceError,
};
pub use goal_service::{GoalDraft, GoalService};
pub use progress::ProgressService;
pub use recovery::{RECOVERY_CODE_TTL_MINUTES, RecoveryService};
pub use session_service::{SessionDraft, SessionService};
pub use subject_service::SubjectService;
