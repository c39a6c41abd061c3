pub mod app_usage;
pub mod observation;
pub mod session;
pub mod user;

pub use app_usage::{sanitize_app_key, AppUsage};
pub use observation::SessionObservation;
pub use session::{Session, SessionStatus, StartedSession};
pub use user::UserStats;
