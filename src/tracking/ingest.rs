//! Telemetry ingestion: one observation from the analysis producer at a time.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    db::{helpers::now, models::sanitize_app_key},
    error::{CoreError, CoreResult},
    log_warn,
};

use super::{LiveStatus, SessionController};

const ENABLE_LOGS: bool = true;

/// Observation exactly as submitted; nothing about its shape is trusted yet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    #[serde(default)]
    pub focus: Value,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub focus: bool,
    pub app_name: String,
    pub activity: String,
}

impl Observation {
    pub fn new(focus: bool, app_name: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            focus,
            app_name: app_name.into(),
            activity: activity.into(),
        }
    }
}

fn required_text(value: Option<String>, field: &str) -> CoreResult<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(CoreError::validation(format!("{field} must be a non-empty string"))),
    }
}

impl TryFrom<RawObservation> for Observation {
    type Error = CoreError;

    fn try_from(raw: RawObservation) -> CoreResult<Self> {
        let focus = raw
            .focus
            .as_bool()
            .ok_or_else(|| CoreError::validation("focus must be a boolean"))?;

        Ok(Self {
            focus,
            app_name: required_text(raw.app_name, "appName")?,
            activity: required_text(raw.activity, "activity")?,
        })
    }
}

impl SessionController {
    /// Validates and applies a raw observation.
    pub async fn ingest(
        &self,
        session_id: &str,
        owner_id: &str,
        raw: RawObservation,
    ) -> CoreResult<()> {
        let observation = Observation::try_from(raw)?;
        self.process_observation(session_id, owner_id, observation)
            .await
    }

    /// Credits one fixed polling interval to the session and to its owner.
    ///
    /// The session write and the owner write are separate store operations.
    /// A failure between them leaves the owner's totals one interval short.
    pub async fn process_observation(
        &self,
        session_id: &str,
        owner_id: &str,
        observation: Observation,
    ) -> CoreResult<()> {
        let not_found = || CoreError::not_found(format!("no open session {session_id}"));

        if self.db.get_open_session(session_id, owner_id).await?.is_none() {
            return Err(not_found());
        }

        let app_key = sanitize_app_key(&observation.app_name);
        let observed_at = now();

        let applied = self
            .db
            .increment_session_counters(
                session_id,
                owner_id,
                observation.focus,
                &app_key,
                &observation.activity,
                self.interval_secs,
                observed_at,
            )
            .await?;
        if !applied {
            // Closed between the lookup and the write.
            return Err(not_found());
        }

        if let Err(err) = self
            .db
            .increment_user_counters(
                owner_id,
                observation.focus,
                &app_key,
                self.interval_secs,
                observed_at,
            )
            .await
        {
            log_warn!(
                "Session {} updated but owner totals for {} were not: {:#}",
                session_id,
                owner_id,
                err
            );
            return Err(err.into());
        }

        log::debug!(
            "Observation for {}: focus={} app={} activity={}",
            session_id,
            observation.focus,
            app_key,
            observation.activity
        );

        self.publish_live_status(
            owner_id,
            LiveStatus {
                session_id: session_id.to_string(),
                focus: observation.focus,
                app_name: app_key,
                activity: observation.activity,
                observed_at,
            },
        )
        .await
    }

    /// Records `status` for the owner unless its session has closed.
    ///
    /// A stop can commit after the counters were credited but before the
    /// board is written. Recording first and checking afterwards means either
    /// this check sees the closed session, or the stop clears the entry.
    pub(super) async fn publish_live_status(
        &self,
        owner_id: &str,
        status: LiveStatus,
    ) -> CoreResult<()> {
        let session_id = status.session_id.clone();
        self.live.record(owner_id, status).await;

        if self.db.get_open_session(&session_id, owner_id).await?.is_none() {
            self.live
                .clear_sessions(owner_id, std::slice::from_ref(&session_id))
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;
    use std::time::Duration;

    const INTERVAL: u64 = 5;

    fn controller() -> (tempfile::TempDir, SessionController) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ingest.sqlite3")).unwrap();
        (dir, SessionController::new(db, Duration::from_secs(INTERVAL)))
    }

    fn raw(value: serde_json::Value) -> RawObservation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        for bad in [
            json!({ "focus": "yes", "appName": "editor", "activity": "coding" }),
            json!({ "appName": "editor", "activity": "coding" }),
            json!({ "focus": true, "appName": "", "activity": "coding" }),
            json!({ "focus": true, "appName": "editor", "activity": "   " }),
            json!({ "focus": true, "appName": "editor" }),
        ] {
            assert!(
                matches!(Observation::try_from(raw(bad.clone())), Err(CoreError::Validation(_))),
                "accepted {bad}"
            );
        }

        let ok = Observation::try_from(raw(
            json!({ "focus": false, "appName": "chat", "activity": "browsing" }),
        ))
        .unwrap();
        assert_eq!(ok, Observation::new(false, "chat", "browsing"));
    }

    #[tokio::test]
    async fn repeated_focus_observations_accumulate_fixed_interval() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        ctl.activate(&started.session_id, "alice").await.unwrap();

        for _ in 0..4 {
            ctl.process_observation(&started.session_id, "alice", Observation::new(true, "x", "typing"))
                .await
                .unwrap();
        }

        let session = ctl.current("alice").await.unwrap();
        assert_eq!(session.focus_time, 4 * INTERVAL);
        assert_eq!(session.distraction_time, 0);
        assert_eq!(session.app_usage.get("x"), 4 * INTERVAL);

        let user = ctl.database().get_user_stats("alice").await.unwrap().unwrap();
        assert_eq!(user.total_focus_time, 4 * INTERVAL);
        assert_eq!(user.app_usage.get("x"), 4 * INTERVAL);
    }

    #[tokio::test]
    async fn user_totals_span_sessions() {
        let (_dir, ctl) = controller();
        let first = ctl.start("alice").await.unwrap();
        ctl.process_observation(&first.session_id, "alice", Observation::new(false, "Chrome.exe", "video"))
            .await
            .unwrap();
        let second = ctl.start("alice").await.unwrap();
        ctl.process_observation(&second.session_id, "alice", Observation::new(false, "Chrome.exe", "video"))
            .await
            .unwrap();

        let user = ctl.database().get_user_stats("alice").await.unwrap().unwrap();
        assert_eq!(user.total_distraction_time, 2 * INTERVAL);
        assert_eq!(user.app_usage.get("Chrome_exe"), 2 * INTERVAL);

        let second = ctl.current("alice").await.unwrap();
        assert_eq!(second.distraction_time, INTERVAL);
    }

    #[tokio::test]
    async fn full_lifecycle_then_ingest_after_stop_is_not_found() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        let active = ctl.activate(&started.session_id, "alice").await.unwrap();

        for _ in 0..3 {
            ctl.ingest(
                &started.session_id,
                "alice",
                raw(json!({ "focus": true, "appName": "editor", "activity": "coding" })),
            )
            .await
            .unwrap();
        }

        let live = ctl.live_status("alice").await.unwrap();
        assert_eq!(live.session_id, started.session_id);
        assert_eq!(live.activity, "coding");

        let stopped = ctl.stop(&started.session_id, "alice").await.unwrap();
        assert_eq!(stopped.start_time, active.start_time);
        assert_eq!(stopped.focus_time, 3 * INTERVAL);
        assert_eq!(stopped.app_usage.get("editor"), 3 * INTERVAL);
        assert!(stopped.end_time.is_some());
        assert!(ctl.live_status("alice").await.is_err());

        let late = ctl
            .ingest(
                &started.session_id,
                "alice",
                raw(json!({ "focus": true, "appName": "editor", "activity": "coding" })),
            )
            .await;
        assert!(matches!(late, Err(CoreError::NotFound(_))));
        assert_eq!(
            ctl.get_by_id(&started.session_id, "alice").await.unwrap(),
            stopped
        );
    }

    #[tokio::test]
    async fn observations_are_stored_with_their_activity() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        ctl.activate(&started.session_id, "alice").await.unwrap();

        for (focus, app, activity) in [
            (true, "Code.exe", "writing tests"),
            (false, "chat", "reading memes"),
        ] {
            ctl.process_observation(&started.session_id, "alice", Observation::new(focus, app, activity))
                .await
                .unwrap();
        }
        ctl.stop(&started.session_id, "alice").await.unwrap();

        let stored = ctl.observations(&started.session_id, "alice").await.unwrap();
        let activities: Vec<_> = stored
            .iter()
            .map(|o| (o.focus, o.app_name.as_str(), o.activity.as_str()))
            .collect();
        assert_eq!(
            activities,
            vec![(true, "Code_exe", "writing tests"), (false, "chat", "reading memes")]
        );
        assert!(matches!(
            ctl.observations(&started.session_id, "bob").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn live_status_for_a_session_closed_mid_ingest_is_dropped() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();

        // The stop lands after the counters were credited, bypassing the board.
        ctl.database()
            .close_session(&started.session_id, "alice", now())
            .await
            .unwrap()
            .unwrap();

        ctl.publish_live_status(
            "alice",
            LiveStatus {
                session_id: started.session_id.clone(),
                focus: true,
                app_name: "editor".into(),
                activity: "coding".into(),
                observed_at: now(),
            },
        )
        .await
        .unwrap();

        assert!(matches!(ctl.live_status("alice").await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn ingest_for_someone_elses_session_is_not_found() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        let result = ctl
            .process_observation(&started.session_id, "bob", Observation::new(true, "editor", "coding"))
            .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
        assert!(ctl.database().get_user_stats("bob").await.unwrap().is_none());
    }
}
