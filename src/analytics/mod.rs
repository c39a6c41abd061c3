//! Read-only reports over the session store: daily rollups, app usage and
//! single-session summaries.

pub mod rollup;
pub mod summary;
pub mod window;

pub use rollup::{AppUsageEntry, DailyRollupEntry};
pub use summary::SessionSummary;
pub use window::DayWindow;

use chrono::{DateTime, Utc};

use crate::{
    db::{helpers::now, Database},
    error::{CoreError, CoreResult},
};

#[derive(Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn daily_rollup(&self, owner_id: &str, days: i64) -> CoreResult<Vec<DailyRollupEntry>> {
        self.daily_rollup_at(owner_id, days, now()).await
    }

    pub async fn daily_app_usage(&self, owner_id: &str, days: i64) -> CoreResult<Vec<AppUsageEntry>> {
        self.daily_app_usage_at(owner_id, days, now()).await
    }

    /// `daily_rollup` with an explicit "now", which fixes what "today" is.
    pub async fn daily_rollup_at(
        &self,
        owner_id: &str,
        days: i64,
        at: DateTime<Utc>,
    ) -> CoreResult<Vec<DailyRollupEntry>> {
        let window = DayWindow::trailing(days, at.date_naive())?;
        let sessions = self
            .db
            .list_sessions_started_between(owner_id, window.start(), window.end())
            .await?;
        Ok(rollup::build_daily_rollup(&sessions, &window))
    }

    pub async fn daily_app_usage_at(
        &self,
        owner_id: &str,
        days: i64,
        at: DateTime<Utc>,
    ) -> CoreResult<Vec<AppUsageEntry>> {
        let window = DayWindow::trailing(days, at.date_naive())?;
        let sessions = self
            .db
            .list_sessions_started_between(owner_id, window.start(), window.end())
            .await?;
        Ok(rollup::build_app_usage(&sessions))
    }

    pub async fn session_summary(&self, session_id: &str, owner_id: &str) -> CoreResult<SessionSummary> {
        let session = self
            .db
            .get_owned_session(session_id, owner_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("session {session_id} not found")))?;
        Ok(summary::summarize_session(&session, now()))
    }
}
