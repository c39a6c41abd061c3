use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::error::{CoreError, CoreResult};

pub const MIN_DAYS: i64 = 1;
pub const MAX_DAYS: i64 = 90;

/// Trailing run of whole UTC calendar days ending with (and including) `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub first_day: NaiveDate,
    pub days: u32,
}

impl DayWindow {
    pub fn trailing(days: i64, today: NaiveDate) -> CoreResult<Self> {
        if !(MIN_DAYS..=MAX_DAYS).contains(&days) {
            return Err(CoreError::validation(format!(
                "days must be between {MIN_DAYS} and {MAX_DAYS}, got {days}"
            )));
        }
        let days = days as u32;
        let first_day = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| CoreError::validation("day window starts before the calendar"))?;
        Ok(Self { first_day, days })
    }

    /// Inclusive lower bound: midnight UTC on the first day.
    pub fn start(&self) -> DateTime<Utc> {
        self.first_day.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Exclusive upper bound: midnight UTC after the last day.
    pub fn end(&self) -> DateTime<Utc> {
        self.start() + chrono::Duration::days(i64::from(self.days))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.first_day.iter_days().take(self.days as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_day_window_bounds() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let window = DayWindow::trailing(7, today).unwrap();

        assert_eq!(window.first_day, NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
        assert_eq!(window.start().to_rfc3339(), "2024-02-25T00:00:00+00:00");
        assert_eq!(window.end().to_rfc3339(), "2024-03-03T00:00:00+00:00");

        let dates: Vec<_> = window.dates().collect();
        assert_eq!(dates.len(), 7);
        assert_eq!(*dates.last().unwrap(), today);
    }

    #[test]
    fn days_out_of_range_is_a_validation_error() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        for bad in [0, -3, 91] {
            assert!(matches!(
                DayWindow::trailing(bad, today),
                Err(CoreError::Validation(_))
            ));
        }
        assert!(DayWindow::trailing(1, today).is_ok());
        assert!(DayWindow::trailing(90, today).is_ok());
    }
}
