use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppUsage;

/// Lifetime counters for one user. Only ever incremented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: String,
    pub total_focus_time: u64,
    pub total_distraction_time: u64,
    pub app_usage: AppUsage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
