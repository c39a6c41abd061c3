use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_optional_datetime, parse_status, to_i64, to_u64},
    models::{AppUsage, Session, SessionObservation, SessionStatus},
};

const SESSION_COLUMNS: &str = "id, owner_id, status, started_at, ended_at, focus_secs, distraction_secs, created_at, updated_at";

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;
    let focus_secs: i64 = row.get("focus_secs")?;
    let distraction_secs: i64 = row.get("distraction_secs")?;

    Ok(Session {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        status: parse_status(&status)?,
        start_time: parse_datetime(&started_at, "started_at")?,
        end_time: parse_optional_datetime(ended_at, "ended_at")?,
        focus_time: to_u64(focus_secs, "focus_secs")?,
        distraction_time: to_u64(distraction_secs, "distraction_secs")?,
        app_usage: AppUsage::new(),
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn load_app_usage(conn: &Connection, session_id: &str) -> Result<AppUsage> {
    let mut stmt = conn.prepare_cached(
        "SELECT app_key, seconds FROM session_app_usage WHERE session_id = ?1",
    )?;
    let mut rows = stmt.query(params![session_id])?;
    let mut usage = AppUsage::new();
    while let Some(row) = rows.next()? {
        let key: String = row.get(0)?;
        let seconds: i64 = row.get(1)?;
        usage.insert_stored(key, to_u64(seconds, "seconds")?);
    }
    Ok(usage)
}

fn query_sessions(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }
    drop(rows);

    for session in &mut sessions {
        session.app_usage = load_app_usage(conn, &session.id)?;
    }
    Ok(sessions)
}

fn query_one(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Option<Session>> {
    Ok(query_sessions(conn, sql, params)?.into_iter().next())
}

fn select_owned(conn: &Connection, session_id: &str, owner_id: &str) -> Result<Option<Session>> {
    query_one(
        conn,
        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND owner_id = ?2"),
        &[&session_id, &owner_id],
    )
}

fn insert_session_row(conn: &Connection, record: &Session) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, owner_id, status, started_at, ended_at, focus_secs, distraction_secs, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id,
            record.owner_id,
            record.status.as_str(),
            format_datetime(&record.start_time),
            record.end_time.as_ref().map(format_datetime),
            to_i64(record.focus_time)?,
            to_i64(record.distraction_time)?,
            format_datetime(&record.created_at),
            format_datetime(&record.updated_at),
        ],
    )?;

    for (key, seconds) in record.app_usage.iter() {
        conn.execute(
            "INSERT INTO session_app_usage (session_id, app_key, seconds) VALUES (?1, ?2, ?3)",
            params![record.id, key, to_i64(seconds)?],
        )?;
    }
    Ok(())
}

impl Database {
    /// Stores a fully formed session record as-is.
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            insert_session_row(&tx, &record).context("failed to insert session")?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Closes every open session of the owner, then inserts `session`.
    ///
    /// Both steps run in one transaction on the store thread, so the owner
    /// never has two open sessions. Returns the ids of the sessions closed.
    pub async fn reconcile_and_insert_session(&self, session: &Session) -> Result<Vec<String>> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let closed_at = format_datetime(&record.start_time);

            let stale_ids: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM sessions WHERE owner_id = ?1 AND ended_at IS NULL",
                )?;
                let ids = stmt
                    .query_map(params![record.owner_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                ids
            };

            // A stale session whose start was rewritten later than now still
            // gets end >= start.
            tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = MAX(started_at, ?2),
                     updated_at = ?2
                 WHERE owner_id = ?3 AND ended_at IS NULL",
                params![SessionStatus::Closed.as_str(), closed_at, record.owner_id],
            )
            .context("failed to close stale sessions")?;

            insert_session_row(&tx, &record).context("failed to insert session")?;
            tx.commit()?;
            Ok(stale_ids)
        })
        .await
    }

    /// Marks an open session as confirmed running, restarting its clock at `now`.
    /// Returns `None` when no open session matches id and owner.
    pub async fn activate_session(
        &self,
        session_id: &str,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let stamp = format_datetime(&now);
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     started_at = ?2,
                     updated_at = ?2
                 WHERE id = ?3 AND owner_id = ?4 AND ended_at IS NULL",
                params![SessionStatus::Active.as_str(), stamp, session_id, owner_id],
            )?;

            if rows_affected == 0 {
                return Ok(None);
            }
            select_owned(conn, &session_id, &owner_id)
        })
        .await
    }

    /// Closes an open session. Returns `None` (and changes nothing) when the
    /// session is unknown, owned by someone else, or already closed.
    pub async fn close_session(
        &self,
        session_id: &str,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let stamp = format_datetime(&now);
            let rows_affected = conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = MAX(started_at, ?2),
                     updated_at = ?2
                 WHERE id = ?3 AND owner_id = ?4 AND ended_at IS NULL",
                params![SessionStatus::Closed.as_str(), stamp, session_id, owner_id],
            )?;

            if rows_affected == 0 {
                return Ok(None);
            }
            select_owned(conn, &session_id, &owner_id)
        })
        .await
    }

    /// Adds one observation's worth of time to an open session and stores the
    /// observation row in the same transaction.
    /// Returns `false` when the session is no longer open for this owner.
    pub async fn increment_session_counters(
        &self,
        session_id: &str,
        owner_id: &str,
        focus: bool,
        app_key: &str,
        activity: &str,
        seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let session_id = session_id.to_string();
        let owner_id = owner_id.to_string();
        let app_key = app_key.to_string();
        let activity = activity.to_string();
        self.execute(move |conn| {
            let seconds = to_i64(seconds)?;
            let (focus_inc, distraction_inc) = if focus { (seconds, 0) } else { (0, seconds) };

            let tx = conn.transaction()?;
            let rows_affected = tx.execute(
                "UPDATE sessions
                 SET focus_secs = focus_secs + ?1,
                     distraction_secs = distraction_secs + ?2,
                     updated_at = ?3
                 WHERE id = ?4 AND owner_id = ?5 AND ended_at IS NULL",
                params![
                    focus_inc,
                    distraction_inc,
                    format_datetime(&now),
                    session_id,
                    owner_id,
                ],
            )?;

            if rows_affected == 0 {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO session_app_usage (session_id, app_key, seconds)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_id, app_key) DO UPDATE SET
                     seconds = session_app_usage.seconds + excluded.seconds",
                params![session_id, app_key, seconds],
            )?;

            tx.execute(
                "INSERT INTO session_observations (session_id, owner_id, observed_at, focus, app_key, activity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![session_id, owner_id, format_datetime(&now), focus, app_key, activity],
            )
            .context("failed to record observation")?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    pub async fn get_open_session(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            query_one(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE id = ?1 AND owner_id = ?2 AND ended_at IS NULL"
                ),
                &[&session_id, &owner_id],
            )
        })
        .await
    }

    pub async fn get_owned_session(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        let owner_id = owner_id.to_string();
        self.execute(move |conn| select_owned(conn, &session_id, &owner_id))
            .await
    }

    pub async fn get_current_session(&self, owner_id: &str) -> Result<Option<Session>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            query_one(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE owner_id = ?1 AND ended_at IS NULL
                     ORDER BY started_at DESC
                     LIMIT 1"
                ),
                &[&owner_id],
            )
        })
        .await
    }

    pub async fn count_open_sessions(&self, owner_id: &str) -> Result<u64> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE owner_id = ?1 AND ended_at IS NULL",
                params![owner_id],
                |row| row.get(0),
            )?;
            to_u64(count, "count")
        })
        .await
    }

    pub async fn list_sessions(&self, owner_id: &str) -> Result<Vec<Session>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            query_sessions(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE owner_id = ?1
                     ORDER BY started_at DESC"
                ),
                &[&owner_id],
            )
        })
        .await
    }

    pub async fn list_sessions_paginated(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Session>> {
        let owner_id = owner_id.to_string();
        let limit = i64::try_from(limit).context("page limit exceeds SQLite INTEGER range")?;
        let offset = i64::try_from(offset).context("page offset exceeds SQLite INTEGER range")?;
        self.execute(move |conn| {
            query_sessions(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE owner_id = ?1
                     ORDER BY started_at DESC
                     LIMIT ?2 OFFSET ?3"
                ),
                &[&owner_id, &limit, &offset],
            )
        })
        .await
    }

    /// Observations credited to the session, oldest first. Rows written for
    /// another owner are never returned.
    pub async fn list_session_observations(
        &self,
        session_id: &str,
        owner_id: &str,
    ) -> Result<Vec<SessionObservation>> {
        let session_id = session_id.to_string();
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, session_id, observed_at, focus, app_key, activity
                 FROM session_observations
                 WHERE session_id = ?1 AND owner_id = ?2
                 ORDER BY observed_at ASC, id ASC",
            )?;
            let mut rows = stmt.query(params![session_id, owner_id])?;
            let mut observations = Vec::new();
            while let Some(row) = rows.next()? {
                let observed_at: String = row.get("observed_at")?;
                observations.push(SessionObservation {
                    id: row.get("id")?,
                    session_id: row.get("session_id")?,
                    observed_at: parse_datetime(&observed_at, "observed_at")?,
                    focus: row.get("focus")?,
                    app_name: row.get("app_key")?,
                    activity: row.get("activity")?,
                });
            }
            Ok(observations)
        })
        .await
    }

    /// Sessions whose start falls in `[from, to)`, oldest first.
    pub async fn list_sessions_started_between(
        &self,
        owner_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let from = format_datetime(&from);
            let to = format_datetime(&to);
            query_sessions(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE owner_id = ?1 AND started_at >= ?2 AND started_at < ?3
                     ORDER BY started_at ASC"
                ),
                &[&owner_id, &from, &to],
            )
        })
        .await
    }
}
