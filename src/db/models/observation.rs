use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored observation, as credited to its session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionObservation {
    pub id: i64,
    pub session_id: String,
    pub observed_at: DateTime<Utc>,
    pub focus: bool,
    pub app_name: String,
    pub activity: String,
}
