//! Expansion of weekday/frequency rules into concrete occurrence dates.
//!
//! Unlike RRULE expansion, the rule here is anchored on the day of the sync
//! run: the first occurrence is the anchor itself or the next day that falls
//! on the target weekday, and occurrences stop at the horizon.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Weekday};

use crate::task::Frequency;
use crate::time_slot::TimeSlot;

/// One concrete instance of a recurring task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub time: TimeSlot,
}

impl Occurrence {
    pub fn naive_start(&self) -> NaiveDateTime {
        self.date.and_time(self.time.to_naive_time())
    }
}

/// Last date that occurrences are generated for: December 31 of the anchor's year.
pub fn year_end_horizon(anchor: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(anchor.year(), 12, 31).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Days(u64),
    Months(u32),
}

impl Step {
    fn for_frequency(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Daily => Step::Days(1),
            Frequency::Weekly => Step::Days(7),
            Frequency::BiWeekly => Step::Days(14),
            Frequency::Monthly => Step::Months(1),
            Frequency::BiMonthly => Step::Months(2),
        }
    }
}

/// Lazy sequence of occurrence dates, ending after the horizon.
///
/// The n-th date is computed from the first one rather than from its
/// predecessor, so a month step clamped to a short month (Jan 31 -> Feb 28)
/// goes back to the 31st in the following months.
#[derive(Debug, Clone)]
pub struct Occurrences {
    first: NaiveDate,
    step: Step,
    horizon: NaiveDate,
    index: u32,
    done: bool,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.done {
            return None;
        }

        let date = match self.step {
            Step::Days(days) => self
                .first
                .checked_add_days(Days::new(days * u64::from(self.index))),
            Step::Months(months) => self
                .first
                .checked_add_months(Months::new(months * self.index)),
        };

        match date {
            Some(date) if date <= self.horizon => {
                self.index += 1;
                Some(date)
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl std::iter::FusedIterator for Occurrences {}

/// First date on or after `anchor` that falls on `target`.
pub fn first_on_or_after(anchor: NaiveDate, target: Weekday) -> NaiveDate {
    let current = anchor.weekday().num_days_from_monday();
    let wanted = target.num_days_from_monday();
    let days_ahead = (wanted + 7 - current) % 7;

    anchor + Days::new(u64::from(days_ahead))
}

/// Occurrence dates for one weekday of a recurring task.
///
/// `target` is ignored for [`Frequency::Daily`], which starts on the anchor.
/// For other frequencies a missing target also starts on the anchor.
pub fn occurrences(
    anchor: NaiveDate,
    target: Option<Weekday>,
    frequency: Frequency,
    horizon: NaiveDate,
) -> Occurrences {
    let first = match (frequency, target) {
        (Frequency::Daily, _) | (_, None) => anchor,
        (_, Some(target)) => first_on_or_after(anchor, target),
    };

    Occurrences {
        first,
        step: Step::for_frequency(frequency),
        horizon,
        index: 0,
        done: false,
    }
}
