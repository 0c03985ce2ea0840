//! Time-of-day windows and weekday selectors.
//!
//! Windows are half-open (`from` inclusive, `until` exclusive). When `from`
//! is later than `until` the window wraps past midnight. An empty window
//! (`from == until`) never contains anything.
//!
//! # Example (YAML)
//!
//! ```yaml
//! days: weekdays
//! from: "22:00"
//! until: "06:30"
//! ```

use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

/// A time-of-day range, possibly wrapping past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start time (inclusive)
    #[serde(deserialize_with = "deserialize_time")]
    pub from: NaiveTime,
    /// End time (exclusive)
    #[serde(deserialize_with = "deserialize_time")]
    pub until: NaiveTime,
}

impl TimeWindow {
    /// Create a window from `from` (inclusive) to `until` (exclusive).
    pub fn new(from: NaiveTime, until: NaiveTime) -> Self {
        Self { from, until }
    }

    /// Whether the window spans midnight.
    pub fn is_overnight(&self) -> bool {
        self.from > self.until
    }

    /// Check if the given time falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.from <= self.until {
            // Normal range (e.g., 09:00 - 17:00); empty when equal
            time >= self.from && time < self.until
        } else {
            // Overnight range (e.g., 23:00 - 06:00)
            time >= self.from || time < self.until
        }
    }

    /// Whole seconds from `time` until the window next ends.
    ///
    /// Returns `None` when `time` is outside the window.
    pub fn seconds_until_end(&self, time: NaiveTime) -> Option<u32> {
        if !self.contains(time) {
            return None;
        }

        let mut remaining = self.until.signed_duration_since(time);
        if self.until <= time {
            // Inside an overnight window before midnight: the end is tomorrow
            remaining += TimeDelta::days(1);
        }
        u32::try_from(remaining.num_seconds()).ok()
    }
}

/// Day selector for weekly windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DaySelector {
    /// A specific list of days (e.g., ["mon", "tue", "wed"])
    List(Vec<String>),
    /// A named group: "all", "weekdays", "weekends", or a single day name
    Named(String),
}

impl Default for DaySelector {
    fn default() -> Self {
        DaySelector::Named("all".to_string())
    }
}

impl DaySelector {
    /// Check if this selector includes the given weekday.
    pub fn matches(&self, weekday: Weekday) -> bool {
        match self {
            DaySelector::Named(name) => match name.to_lowercase().as_str() {
                "all" => true,
                "weekdays" => matches!(
                    weekday,
                    Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri
                ),
                "weekends" => matches!(weekday, Weekday::Sat | Weekday::Sun),
                _ => weekday_from_str(name) == Some(weekday),
            },
            DaySelector::List(days) => days.iter().any(|d| weekday_from_str(d) == Some(weekday)),
        }
    }
}

/// A weekly window: a time range on selected days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    /// Days the window applies to (default: all)
    #[serde(default)]
    pub days: DaySelector,
    /// Time range on those days
    #[serde(flatten)]
    pub time: TimeWindow,
}

impl ActiveWindow {
    /// Check if the window is open at the given local date and time.
    ///
    /// Only the weekday of `at` is consulted for the day check, so the
    /// after-midnight tail of an overnight window belongs to the next day.
    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        self.days.matches(at.weekday()) && self.time.contains(at.time())
    }
}

/// Parse a time string (HH:MM or HH:MM:SS) into NaiveTime.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    let (hour, minute, second) = match parts.as_slice() {
        [h, m] => (h.parse().ok()?, m.parse().ok()?, 0),
        [h, m, s] => (h.parse().ok()?, m.parse().ok()?, s.parse().ok()?),
        _ => return None,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", raw)))
}

/// Convert a day name to Weekday.
fn weekday_from_str(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
