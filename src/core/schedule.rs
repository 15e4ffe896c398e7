//! Daily schedule hint.
//!
//! Only computes when the next automatic run is expected so the status
//! document can show it. Nothing here triggers runs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use thiserror::Error;

/// A run expected once a day at a fixed UTC time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
}

/// Invalid `HH:MM` schedule string
#[derive(Debug, Clone, Error)]
#[error("Invalid daily schedule '{input}': expected HH:MM (UTC)")]
pub struct ScheduleParseError {
    input: String,
}

impl DailySchedule {
    /// Schedule at `hour:minute` UTC; `None` if out of range
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    /// The next slot strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.time).and_utc();
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            time: NaiveTime::default() + Duration::hours(12),
        }
    }
}

impl FromStr for DailySchedule {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ScheduleParseError {
            input: s.to_string(),
        };

        let (hour, minute) = s.trim().split_once(':').ok_or_else(err)?;
        let hour: u32 = hour.parse().map_err(|_| err())?;
        let minute: u32 = minute.parse().map_err(|_| err())?;

        Self::at(hour, minute).ok_or_else(err)
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Daily at {} UTC", self.time.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse() {
        let schedule: DailySchedule = "12:00".parse().unwrap();
        assert_eq!(schedule, DailySchedule::default());

        let schedule: DailySchedule = " 7:05 ".parse().unwrap();
        assert_eq!(schedule, DailySchedule::at(7, 5).unwrap());

        assert!("24:00".parse::<DailySchedule>().is_err());
        assert!("12".parse::<DailySchedule>().is_err());
        assert!("noon".parse::<DailySchedule>().is_err());
    }

    #[test]
    fn test_next_after_same_day() {
        let schedule = DailySchedule::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap();

        assert_eq!(
            schedule.next_after(now),
            Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_after_rolls_over() {
        let schedule = DailySchedule::default();

        let at_slot = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(at_slot),
            Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap()
        );

        let month_end = Utc.with_ymd_and_hms(2024, 2, 29, 18, 0, 0).unwrap();
        assert_eq!(
            schedule.next_after(month_end),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(DailySchedule::default().to_string(), "Daily at 12:00 UTC");
    }
}
