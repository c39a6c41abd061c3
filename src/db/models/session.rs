//! Session records and their lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppUsage;

/// `Pending` sessions exist server-side but the telemetry producer has not
/// confirmed it is running yet. Both `Pending` and `Active` are open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Pending,
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "Pending",
            SessionStatus::Active => "Active",
            SessionStatus::Closed => "Closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub owner_id: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds
    pub focus_time: u64,
    pub distraction_time: u64,
    pub app_usage: AppUsage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new_pending(id: String, owner_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id,
            status: SessionStatus::Pending,
            start_time: now,
            end_time: None,
            focus_time: 0,
            distraction_time: 0,
            app_usage: AppUsage::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reply to a start request. `start_time` is provisional until activation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
}

impl From<&Session> for StartedSession {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            start_time: session.start_time,
        }
    }
}
