//! Provider-neutral calendar event descriptions.
//!
//! The materializer produces these; calendar providers convert them into
//! their own API payloads.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

/// A calendar event to be created or updated.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    /// Only set when the task carries a priority.
    pub color: Option<EventColor>,
}

/// Start or end of an event. All-day and timed events are exclusive
/// representations.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<Tz>),
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTime(dt) => write!(f, "{} ({})", dt.to_rfc3339(), dt.timezone().name()),
        }
    }
}

impl fmt::Display for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {} -> {}", self.summary, self.start, self.end)?;
        if let Some(color) = self.color {
            write!(f, " [color {}]", color.color_id())?;
        }
        Ok(())
    }
}

/// Event colors from the Google Calendar palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventColor {
    Sage,
    Banana,
    Tomato,
}

impl EventColor {
    /// Google Calendar `colorId` for this color.
    pub fn color_id(self) -> &'static str {
        match self {
            EventColor::Sage => "2",
            EventColor::Banana => "5",
            EventColor::Tomato => "11",
        }
    }
}
