//! Strongly typed task records.
//!
//! A [`TaskRecord`] is what the sync logic sees of a row in the task
//! database. Providers convert their own loosely structured rows into this
//! shape; day names, priorities and frequencies are normalized on the way in
//! so the rest of the crate never deals with raw labels.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Weekday};
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};
use crate::event::EventColor;

/// Duration used when a recurring task has no usable duration.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Longest accepted event, one week.
pub const MAX_DURATION_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// A schedulable task as read from the task database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub explicit_date: Option<ExplicitDate>,
    pub days_of_week: Vec<Weekday>,
    pub time_slot: Option<String>,
    pub duration_minutes: Option<f64>,
    pub priority: Option<Priority>,
    pub frequency: Option<Frequency>,
    pub linked_event_id: Option<String>,
}

/// An explicit date range, kept in the string form the task database uses
/// ("2025-03-20" or "2025-03-20T15:00:00.000-04:00").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExplicitDate {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

impl ExplicitDate {
    pub fn is_all_day(&self) -> bool {
        !self.start.contains('T')
    }
}

/// The recurring fields of a task, once they are known to be complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecurringFields<'a> {
    pub days: &'a [Weekday],
    pub time_slot: &'a str,
    pub frequency: Frequency,
}

/// How a task record is to be synced.
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule<'a> {
    Explicit(&'a ExplicitDate),
    Recurring(RecurringFields<'a>),
    Incomplete(IncompleteReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// Neither an explicit date nor any recurring field is set.
    NoSchedule,
    MissingTimeSlot,
    MissingDays,
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompleteReason::NoSchedule => write!(f, "no date and no recurring fields"),
            IncompleteReason::MissingTimeSlot => write!(f, "no date and missing Time Slot"),
            IncompleteReason::MissingDays => write!(f, "no date and missing Day of the Week"),
        }
    }
}

impl TaskRecord {
    /// Classify the record. An explicit date always wins over recurring fields.
    pub fn schedule(&self) -> Schedule<'_> {
        if let Some(date) = &self.explicit_date {
            return Schedule::Explicit(date);
        }

        let time_slot = self
            .time_slot
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (time_slot, self.days_of_week.is_empty()) {
            (None, true) => Schedule::Incomplete(IncompleteReason::NoSchedule),
            (None, false) => Schedule::Incomplete(IncompleteReason::MissingTimeSlot),
            (Some(_), true) => Schedule::Incomplete(IncompleteReason::MissingDays),
            (Some(time_slot), false) => Schedule::Recurring(RecurringFields {
                days: &self.days_of_week,
                time_slot,
                frequency: self.frequency.unwrap_or_default(),
            }),
        }
    }

    /// Event length for recurring occurrences. Missing, zero or negative
    /// values fall back to an hour; anything over a week is rejected.
    pub fn duration(&self) -> SyncResult<Duration> {
        match self.duration_minutes {
            Some(minutes) if minutes > MAX_DURATION_MINUTES => Err(SyncError::Validation(format!(
                "Duration of {} minutes exceeds {} minutes",
                minutes, MAX_DURATION_MINUTES
            ))),
            Some(minutes) if minutes.is_finite() && minutes > 0.0 => {
                Ok(Duration::seconds((minutes * 60.0).round() as i64))
            }
            _ => Ok(Duration::minutes(DEFAULT_DURATION_MINUTES)),
        }
    }

    pub fn color(&self) -> Option<EventColor> {
        self.priority.map(Priority::color)
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Resolve a weekday label, tolerating an ordinal prefix such as "1-Monday".
pub fn parse_weekday(label: &str) -> Option<Weekday> {
    let name = label.rsplit('-').next().unwrap_or(label).trim();

    match name.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn color(self) -> EventColor {
        match self {
            Priority::High => EventColor::Tomato,
            Priority::Medium => EventColor::Banana,
            Priority::Low => EventColor::Sage,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// How often a recurring task repeats. Absent means weekly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    #[default]
    Weekly,
    BiWeekly,
    Monthly,
    BiMonthly,
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | ' ' | '_'))
            .collect();

        match normalized.as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::BiWeekly),
            "monthly" => Ok(Frequency::Monthly),
            "bimonthly" => Ok(Frequency::BiMonthly),
            _ => Err(format!("unknown frequency '{}'", s.trim())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::BiWeekly => "Bi-Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::BiMonthly => "Bi-Monthly",
        };
        f.write_str(label)
    }
}
