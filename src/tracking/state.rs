use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Most recent observation accepted for an owner's open session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    pub session_id: String,
    pub focus: bool,
    pub app_name: String,
    pub activity: String,
    pub observed_at: DateTime<Utc>,
}

/// In-memory, per-owner view of the last observation. Not persisted.
#[derive(Clone, Default)]
pub struct LiveStatusBoard {
    inner: Arc<RwLock<HashMap<String, LiveStatus>>>,
}

impl LiveStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, owner_id: &str, status: LiveStatus) {
        self.inner.write().await.insert(owner_id.to_string(), status);
    }

    pub async fn get(&self, owner_id: &str) -> Option<LiveStatus> {
        self.inner.read().await.get(owner_id).cloned()
    }

    /// Drops the owner's entry if it belongs to one of `session_ids`.
    pub async fn clear_sessions(&self, owner_id: &str, session_ids: &[String]) {
        let mut guard = self.inner.write().await;
        let matches = guard
            .get(owner_id)
            .map(|status| session_ids.iter().any(|id| *id == status.session_id))
            .unwrap_or(false);
        if matches {
            guard.remove(owner_id);
        }
    }
}
