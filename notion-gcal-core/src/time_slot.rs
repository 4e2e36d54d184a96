//! Parsing of compact `HHMM` clock-time tokens.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;

use crate::error::{SyncError, SyncResult};

/// A wall-clock time of day taken from a task's time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub hour: u32,
    pub minute: u32,
}

impl TimeSlot {
    pub fn to_naive_time(self) -> NaiveTime {
        // hour and minute are range-checked on construction
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeSlot {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_slot(s)
    }
}

/// Parse a 4-digit `HHMM` token into a [`TimeSlot`].
///
/// Leading and trailing whitespace is ignored. Anything else that is not
/// exactly four ASCII digits with an hour in 0..=23 and a minute in 0..=59
/// is rejected with [`SyncError::InvalidTimeFormat`] carrying the input.
pub fn parse_time_slot(input: &str) -> SyncResult<TimeSlot> {
    let token = input.trim();
    let invalid = || SyncError::InvalidTimeFormat(input.to_string());

    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u32 = token[..2].parse().map_err(|_| invalid())?;
    let minute: u32 = token[2..].parse().map_err(|_| invalid())?;

    if hour > 23 || minute > 59 {
        return Err(invalid());
    }

    Ok(TimeSlot { hour, minute })
}
