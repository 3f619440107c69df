mod goal;
mod ids;
mod progress;
mod session;
mod subject;
mod user;

pub use ids::{GoalId, ParseIdError, SessionId, SubjectId, UserId};

pub use goal::{Goal, GoalError, GoalType, ProgressTier};
pub use progress::GoalProgress;
pub use session::{StudySession, StudySessionError};
pub use subject::{Subject, SubjectError};
pub use user::{RecoveryCode, RecoveryStatus, User, UserError};
