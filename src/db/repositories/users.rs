use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_i64, to_u64},
    models::{AppUsage, UserStats},
};

impl Database {
    /// Adds one observation's worth of time to the user's lifetime counters,
    /// creating the row on first use.
    pub async fn increment_user_counters(
        &self,
        user_id: &str,
        focus: bool,
        app_key: &str,
        seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let user_id = user_id.to_string();
        let app_key = app_key.to_string();
        self.execute(move |conn| {
            let seconds = to_i64(seconds)?;
            let (focus_inc, distraction_inc) = if focus { (seconds, 0) } else { (0, seconds) };
            let stamp = format_datetime(&now);

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO user_stats (user_id, total_focus_secs, total_distraction_secs, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                     total_focus_secs = user_stats.total_focus_secs + excluded.total_focus_secs,
                     total_distraction_secs = user_stats.total_distraction_secs + excluded.total_distraction_secs,
                     updated_at = excluded.updated_at",
                params![user_id, focus_inc, distraction_inc, stamp],
            )
            .context("failed to update user totals")?;

            tx.execute(
                "INSERT INTO user_app_usage (user_id, app_key, seconds)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, app_key) DO UPDATE SET
                     seconds = user_app_usage.seconds + excluded.seconds",
                params![user_id, app_key, seconds],
            )
            .context("failed to update user app usage")?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT total_focus_secs, total_distraction_secs, created_at, updated_at
                     FROM user_stats WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((focus, distraction, created_at, updated_at)) = row else {
                return Ok(None);
            };

            let mut app_usage = AppUsage::new();
            let mut stmt =
                conn.prepare("SELECT app_key, seconds FROM user_app_usage WHERE user_id = ?1")?;
            let mut rows = stmt.query(params![user_id])?;
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                let seconds: i64 = row.get(1)?;
                app_usage.insert_stored(key, to_u64(seconds, "seconds")?);
            }

            Ok(Some(UserStats {
                user_id: user_id.clone(),
                total_focus_time: to_u64(focus, "total_focus_secs")?,
                total_distraction_time: to_u64(distraction, "total_distraction_secs")?,
                app_usage,
                created_at: parse_datetime(&created_at, "created_at")?,
                updated_at: parse_datetime(&updated_at, "updated_at")?,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::helpers::now;

    #[tokio::test]
    async fn creates_then_accumulates_user_totals() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("users.sqlite3")).unwrap();
        assert!(db.get_user_stats("alice").await.unwrap().is_none());

        db.increment_user_counters("alice", true, "editor", 5, now())
            .await
            .unwrap();
        db.increment_user_counters("alice", true, "editor", 5, now())
            .await
            .unwrap();
        db.increment_user_counters("alice", false, "chat", 5, now())
            .await
            .unwrap();

        let stats = db.get_user_stats("alice").await.unwrap().unwrap();
        assert_eq!(stats.total_focus_time, 10);
        assert_eq!(stats.total_distraction_time, 5);
        assert_eq!(stats.app_usage.get("editor"), 10);
        assert_eq!(stats.app_usage.get("chat"), 5);
        assert!(stats.updated_at >= stats.created_at);
    }
}
