//! Per-session report: duration, productivity share and time per app.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMinutes {
    pub app_name: String,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: f64,
    pub productivity_percentage: f64,
    pub focus_minutes: f64,
    pub distraction_minutes: f64,
    pub app_minutes: Vec<AppMinutes>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn minutes(seconds: u64) -> f64 {
    round2(seconds as f64 / 60.0)
}

/// Open sessions are measured up to `now`.
pub fn summarize_session(session: &Session, now: DateTime<Utc>) -> SessionSummary {
    let until = session.end_time.unwrap_or(now);
    let duration_secs = (until - session.start_time).num_milliseconds().max(0) as f64 / 1000.0;

    let tracked = session.focus_time + session.distraction_time;
    let productivity = if tracked == 0 {
        0.0
    } else {
        100.0 * session.focus_time as f64 / tracked as f64
    };

    let mut app_minutes: Vec<AppMinutes> = session
        .app_usage
        .iter()
        .map(|(app, seconds)| AppMinutes {
            app_name: app.to_string(),
            minutes: minutes(seconds),
        })
        .collect();
    app_minutes.sort_by(|a, b| {
        b.minutes
            .total_cmp(&a.minutes)
            .then_with(|| a.app_name.cmp(&b.app_name))
    });

    SessionSummary {
        session_id: session.id.clone(),
        start_time: session.start_time,
        end_time: session.end_time,
        duration_minutes: round2(duration_secs / 60.0),
        productivity_percentage: round2(productivity),
        focus_minutes: minutes(session.focus_time),
        distraction_minutes: minutes(session.distraction_time),
        app_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn summarizes_closed_session() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut session = Session::new_pending("s1".into(), "alice".into(), start);
        session.end_time = Some(start + Duration::seconds(1230));
        session.focus_time = 200;
        session.distraction_time = 100;
        session.app_usage.add("editor", 200);
        session.app_usage.add("chat", 100);

        let summary = summarize_session(&session, start + Duration::days(1));
        assert_eq!(summary.duration_minutes, 20.5);
        assert_eq!(summary.productivity_percentage, 66.67);
        assert_eq!(summary.focus_minutes, 3.33);
        assert_eq!(summary.distraction_minutes, 1.67);
        assert_eq!(summary.app_minutes[0].app_name, "editor");
        assert_eq!(summary.app_minutes[1].minutes, 1.67);
    }

    #[test]
    fn open_session_runs_until_now() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let session = Session::new_pending("s1".into(), "alice".into(), start);

        let summary = summarize_session(&session, start + Duration::minutes(3));
        assert_eq!(summary.duration_minutes, 3.0);
        assert_eq!(summary.productivity_percentage, 0.0);
        assert!(summary.app_minutes.is_empty());
    }
}
