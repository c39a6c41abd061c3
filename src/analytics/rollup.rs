//! Pure aggregation over already-loaded sessions.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::Session;

use super::window::DayWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRollupEntry {
    pub date: NaiveDate,
    pub focus_time: u64,
    pub distraction_time: u64,
    pub session_count: u32,
    pub focus_percentage: u32,
}

impl DailyRollupEntry {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            focus_time: 0,
            distraction_time: 0,
            session_count: 0,
            focus_percentage: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUsageEntry {
    pub app_name: String,
    pub total_time: u64,
}

/// Share of tracked time spent focused, rounded to a whole percent.
pub fn focus_percentage(focus: u64, distraction: u64) -> u32 {
    let total = focus + distraction;
    if total == 0 {
        return 0;
    }
    (100.0 * focus as f64 / total as f64).round() as u32
}

/// One entry per day of `window`, ascending, including days with no sessions.
pub fn build_daily_rollup(sessions: &[Session], window: &DayWindow) -> Vec<DailyRollupEntry> {
    let mut by_day: HashMap<NaiveDate, DailyRollupEntry> = HashMap::new();

    for session in sessions {
        let date = session.start_time.date_naive();
        let entry = by_day
            .entry(date)
            .or_insert_with(|| DailyRollupEntry::empty(date));
        entry.focus_time += session.focus_time;
        entry.distraction_time += session.distraction_time;
        entry.session_count += 1;
    }

    window
        .dates()
        .map(|date| {
            let mut entry = by_day
                .remove(&date)
                .unwrap_or_else(|| DailyRollupEntry::empty(date));
            entry.focus_percentage = focus_percentage(entry.focus_time, entry.distraction_time);
            entry
        })
        .collect()
}

/// Total seconds per app across all sessions, largest first.
pub fn build_app_usage(sessions: &[Session]) -> Vec<AppUsageEntry> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for (app, seconds) in sessions.iter().flat_map(|s| s.app_usage.iter()) {
        *totals.entry(app).or_insert(0) += seconds;
    }

    let mut entries: Vec<AppUsageEntry> = totals
        .into_iter()
        .map(|(app_name, total_time)| AppUsageEntry {
            app_name: app_name.to_string(),
            total_time,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.total_time
            .cmp(&a.total_time)
            .then_with(|| a.app_name.cmp(&b.app_name))
    });
    entries
}
