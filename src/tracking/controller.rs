use std::time::Duration;

use uuid::Uuid;

use crate::{
    db::{helpers::now, Database, Session, SessionObservation, StartedSession},
    error::{CoreError, CoreResult},
    log_info, log_warn,
};

use super::{LiveStatus, LiveStatusBoard};

const ENABLE_LOGS: bool = true;

pub const MAX_PAGE_SIZE: usize = 500;

/// Largest offset the store can express as an SQLite INTEGER.
const MAX_PAGE_OFFSET: usize = i64::MAX as usize;

/// Drives the `Pending -> Active -> Closed` lifecycle of monitoring sessions
/// and serves the read side for individual sessions.
#[derive(Clone)]
pub struct SessionController {
    pub(super) db: Database,
    pub(super) interval_secs: u64,
    pub(super) live: LiveStatusBoard,
}

impl SessionController {
    pub fn new(db: Database, telemetry_interval: Duration) -> Self {
        Self {
            db,
            interval_secs: telemetry_interval.as_secs(),
            live: LiveStatusBoard::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Seconds credited per accepted observation.
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Opens a new pending session, closing any session the owner left open.
    pub async fn start(&self, owner_id: &str) -> CoreResult<StartedSession> {
        let session = Session::new_pending(Uuid::new_v4().to_string(), owner_id.to_string(), now());

        let closed = self.db.reconcile_and_insert_session(&session).await?;
        if !closed.is_empty() {
            log_warn!(
                "Closed {} stale session(s) for owner {} before starting {}: {:?}",
                closed.len(),
                owner_id,
                session.id,
                closed
            );
            self.live.clear_sessions(owner_id, &closed).await;
        }

        log_info!("Started pending session {} for owner {}", session.id, owner_id);
        Ok(StartedSession::from(&session))
    }

    /// Confirms the producer is running and restarts the session clock.
    pub async fn activate(&self, session_id: &str, owner_id: &str) -> CoreResult<Session> {
        let session = self
            .db
            .activate_session(session_id, owner_id, now())
            .await?
            .ok_or_else(|| CoreError::not_found(format!("no open session {session_id}")))?;

        log_info!("Activated session {} at {}", session.id, session.start_time);
        Ok(session)
    }

    /// Closes an open session. Stopping an already-closed session is a
    /// `NotFound` and leaves the record untouched.
    pub async fn stop(&self, session_id: &str, owner_id: &str) -> CoreResult<Session> {
        let session = self
            .db
            .close_session(session_id, owner_id, now())
            .await?
            .ok_or_else(|| CoreError::not_found(format!("no open session {session_id}")))?;

        self.live
            .clear_sessions(owner_id, std::slice::from_ref(&session.id))
            .await;

        log_info!(
            "Stopped session {} (focus {}s, distraction {}s)",
            session.id,
            session.focus_time,
            session.distraction_time
        );
        Ok(session)
    }

    pub async fn current(&self, owner_id: &str) -> CoreResult<Session> {
        self.db
            .get_current_session(owner_id)
            .await?
            .ok_or_else(|| CoreError::not_found("no open session"))
    }

    /// All of the owner's sessions, newest start first.
    pub async fn history(&self, owner_id: &str) -> CoreResult<Vec<Session>> {
        Ok(self.db.list_sessions(owner_id).await?)
    }

    pub async fn history_page(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> CoreResult<Vec<Session>> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(CoreError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if offset > MAX_PAGE_OFFSET {
            return Err(CoreError::validation(format!(
                "offset must be at most {MAX_PAGE_OFFSET}"
            )));
        }
        Ok(self
            .db
            .list_sessions_paginated(owner_id, limit, offset)
            .await?)
    }

    /// Unknown ids and ids owned by someone else are indistinguishable.
    pub async fn get_by_id(&self, session_id: &str, owner_id: &str) -> CoreResult<Session> {
        self.db
            .get_owned_session(session_id, owner_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("session {session_id} not found")))
    }

    /// Stored observations of one of the owner's sessions, oldest first.
    pub async fn observations(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> CoreResult<Vec<SessionObservation>> {
        self.get_by_id(session_id, owner_id).await?;
        Ok(self
            .db
            .list_session_observations(session_id, owner_id)
            .await?)
    }

    pub async fn live_status(&self, owner_id: &str) -> CoreResult<LiveStatus> {
        self.live
            .get(owner_id)
            .await
            .ok_or_else(|| CoreError::not_found("no live status"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SessionStatus;

    fn controller() -> (tempfile::TempDir, SessionController) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("controller.sqlite3")).unwrap();
        (dir, SessionController::new(db, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn start_creates_pending_open_session() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();

        let current = ctl.current("alice").await.unwrap();
        assert_eq!(current.id, started.session_id);
        assert_eq!(current.status, SessionStatus::Pending);
        assert_eq!(current.start_time, started.start_time);
        assert!(current.end_time.is_none());
        assert_eq!(current.focus_time, 0);
        assert!(current.app_usage.is_empty());
    }

    #[tokio::test]
    async fn second_start_reconciles_the_first() {
        let (_dir, ctl) = controller();
        let first = ctl.start("alice").await.unwrap();
        let second = ctl.start("alice").await.unwrap();

        assert_eq!(ctl.database().count_open_sessions("alice").await.unwrap(), 1);

        let stale = ctl.get_by_id(&first.session_id, "alice").await.unwrap();
        let stale_end = stale.end_time.expect("stale session closed");
        assert!(stale_end <= second.start_time);
        assert!(stale_end >= stale.start_time);
        assert_eq!(ctl.current("alice").await.unwrap().id, second.session_id);
    }

    #[tokio::test]
    async fn activate_moves_start_to_call_time() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let before = now();
        let active = ctl.activate(&started.session_id, "alice").await.unwrap();
        assert_eq!(active.status, SessionStatus::Active);
        assert!(active.start_time >= before);
        assert!(active.start_time > started.start_time);
    }

    #[tokio::test]
    async fn activate_requires_open_owned_session() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();

        assert!(matches!(
            ctl.activate(&started.session_id, "bob").await,
            Err(CoreError::NotFound(_))
        ));

        ctl.stop(&started.session_id, "alice").await.unwrap();
        assert!(matches!(
            ctl.activate(&started.session_id, "alice").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn double_stop_is_not_found_and_leaves_record_unchanged() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        let stopped = ctl.stop(&started.session_id, "alice").await.unwrap();
        assert_eq!(stopped.status, SessionStatus::Closed);
        assert!(stopped.end_time.unwrap() >= stopped.start_time);

        assert!(matches!(
            ctl.stop(&started.session_id, "alice").await,
            Err(CoreError::NotFound(_))
        ));
        let after = ctl.get_by_id(&started.session_id, "alice").await.unwrap();
        assert_eq!(after, stopped);
        assert!(matches!(ctl.current("alice").await, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_by_id_hides_other_owners_sessions() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();
        assert!(matches!(
            ctl.get_by_id(&started.session_id, "mallory").await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            ctl.get_by_id("does-not-exist", "alice").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_paginates() {
        let (_dir, ctl) = controller();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(ctl.start("alice").await.unwrap().session_id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        ctl.start("bob").await.unwrap();

        let history: Vec<_> = ctl
            .history("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.reverse();
        assert_eq!(history, ids);

        let page = ctl.history_page("alice", 1, 1).await.unwrap();
        assert_eq!(page[0].id, ids[1]);
        assert!(matches!(
            ctl.history_page("alice", 0, 0).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn history_page_rejects_offsets_the_store_cannot_express() {
        let (_dir, ctl) = controller();
        ctl.start("alice").await.unwrap();

        assert!(matches!(
            ctl.history_page("alice", 10, usize::MAX).await,
            Err(CoreError::Validation(_))
        ));
        assert!(ctl
            .history_page("alice", 10, MAX_PAGE_OFFSET)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn observations_require_ownership() {
        let (_dir, ctl) = controller();
        let started = ctl.start("alice").await.unwrap();

        assert!(ctl.observations(&started.session_id, "alice").await.unwrap().is_empty());
        assert!(matches!(
            ctl.observations(&started.session_id, "mallory").await,
            Err(CoreError::NotFound(_))
        ));
    }
}
