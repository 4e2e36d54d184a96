//! Conversion of task schedules into calendar event descriptions.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::error::{SyncError, SyncResult};
use crate::event::{EventColor, EventPayload, EventTime};
use crate::occurrence::Occurrence;
use crate::task::ExplicitDate;

/// Formats accepted for datetimes without an offset, interpreted in the
/// configured timezone.
const FLOATING_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Build the event for a task with an explicit date.
///
/// A start without a time component yields an all-day event ending the next
/// day unless an end is given. Timed starts end one hour later unless an end
/// is given.
pub fn explicit_event(
    title: &str,
    date: &ExplicitDate,
    tz: Tz,
    color: Option<EventColor>,
) -> SyncResult<EventPayload> {
    let (start, end) = if date.is_all_day() {
        let start = parse_date(&date.start)?;
        let end = match date.end.as_deref() {
            Some(end) => parse_date(end)?,
            None => start
                .checked_add_days(Days::new(1))
                .ok_or_else(|| SyncError::InvalidDate(date.start.clone()))?,
        };
        (EventTime::Date(start), EventTime::Date(end))
    } else {
        let start = parse_datetime(&date.start, tz)?;
        let end = match date.end.as_deref() {
            Some(end) => parse_datetime(end, tz)?,
            None => start
                .checked_add_signed(Duration::hours(1))
                .ok_or_else(|| SyncError::InvalidDate(date.start.clone()))?,
        };
        (EventTime::DateTime(start), EventTime::DateTime(end))
    };

    Ok(EventPayload {
        summary: title.to_string(),
        start,
        end,
        color,
    })
}

/// Build the timed event for one occurrence of a recurring task.
pub fn occurrence_event(
    title: &str,
    occurrence: &Occurrence,
    duration: Duration,
    tz: Tz,
    color: Option<EventColor>,
) -> SyncResult<EventPayload> {
    let start = localize(occurrence.naive_start(), tz);
    let end = start.checked_add_signed(duration).ok_or_else(|| {
        SyncError::InvalidDate(format!("{} plus {} minutes", start, duration.num_minutes()))
    })?;

    Ok(EventPayload {
        summary: title.to_string(),
        start: EventTime::DateTime(start),
        end: EventTime::DateTime(end),
        color,
    })
}

/// Resolve a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant; times skipped by a DST transition move forward by an hour.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        }
    }
}

fn parse_date(value: &str) -> SyncResult<NaiveDate> {
    let date_part = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part.trim(), "%Y-%m-%d")
        .map_err(|_| SyncError::InvalidDate(value.to_string()))
}

fn parse_datetime(value: &str, tz: Tz) -> SyncResult<DateTime<Tz>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&tz));
    }

    for format in FLOATING_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(localize(naive, tz));
        }
    }

    // A date-only end paired with a timed start means midnight
    if !value.contains('T') {
        if let Ok(date) = parse_date(value) {
            return Ok(localize(date.and_time(chrono::NaiveTime::MIN), tz));
        }
    }

    Err(SyncError::InvalidDate(value.to_string()))
}
