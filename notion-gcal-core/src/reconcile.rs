//! Per-record reconciliation between the task database and the calendar.
//!
//! A record with an explicit date maps to exactly one event, tracked through
//! the record's back-reference: it is created once and updated on later runs.
//! A recurring record is expanded into one event per occurrence up to the
//! horizon. Occurrences are always created; only the first created id is
//! written back to the record.

use std::fmt;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::event::EventPayload;
use crate::materialize::{explicit_event, occurrence_event};
use crate::occurrence::{occurrences, year_end_horizon, Occurrence};
use crate::provider::{CalendarService, TaskStore};
use crate::task::{ExplicitDate, Frequency, IncompleteReason, RecurringFields, Schedule, TaskRecord};
use crate::time_slot::parse_time_slot;

/// Prefix for ids handed out instead of real ones in dry-run mode.
pub const DRY_RUN_ID_PREFIX: &str = "dry-run-";

/// Settings shared by every reconciliation in a run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub calendar_id: String,
    pub timezone: Tz,
    /// When set, no create, update or write-back reaches a collaborator.
    pub dry_run: bool,
}

/// Why a record produced no calendar calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Untitled,
    Incomplete(IncompleteReason),
    InvalidTimeSlot(String),
    NoOccurrences,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Untitled => write!(f, "empty title"),
            SkipReason::Incomplete(reason) => write!(f, "{}", reason),
            SkipReason::InvalidTimeSlot(slot) => write!(f, "invalid time slot '{}'", slot),
            SkipReason::NoOccurrences => write!(f, "no occurrences before the horizon"),
        }
    }
}

/// Result of reconciling one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created { event_id: String },
    Updated { event_id: String },
    /// The linked event was gone and a replacement was created.
    Recreated { stale_id: String, event_id: String },
    Expanded {
        created: usize,
        failed: usize,
        linked: Option<String>,
    },
    Skipped(SkipReason),
}

impl RecordOutcome {
    /// A recurring record counts as failed only when none of its occurrences
    /// could be created.
    pub fn is_failure(&self) -> bool {
        matches!(self, RecordOutcome::Expanded { created: 0, failed, .. } if *failed > 0)
    }

    pub fn events_created(&self) -> usize {
        match self {
            RecordOutcome::Created { .. } | RecordOutcome::Recreated { .. } => 1,
            RecordOutcome::Expanded { created, .. } => *created,
            _ => 0,
        }
    }

    pub fn events_updated(&self) -> usize {
        match self {
            RecordOutcome::Updated { .. } => 1,
            _ => 0,
        }
    }
}

pub struct Reconciler<'a, S: ?Sized, C: ?Sized> {
    store: &'a S,
    calendar: &'a C,
    options: &'a SyncOptions,
}

impl<'a, S, C> Reconciler<'a, S, C>
where
    S: TaskStore + ?Sized,
    C: CalendarService + ?Sized,
{
    pub fn new(store: &'a S, calendar: &'a C, options: &'a SyncOptions) -> Self {
        Reconciler {
            store,
            calendar,
            options,
        }
    }

    /// Reconcile one record. `anchor` is the run's current date in the
    /// configured timezone; recurring occurrences start there.
    pub async fn reconcile(&self, task: &TaskRecord, anchor: NaiveDate) -> SyncResult<RecordOutcome> {
        if !task.has_title() {
            warn!(page_id = %task.id, "Skipping page: empty title");
            return Ok(RecordOutcome::Skipped(SkipReason::Untitled));
        }

        match task.schedule() {
            Schedule::Explicit(date) => self.sync_explicit(task, date).await,
            Schedule::Recurring(fields) => self.sync_recurring(task, fields, anchor).await,
            Schedule::Incomplete(reason) => {
                info!(page_id = %task.id, title = %task.title, "Skipping page ({})", reason);
                Ok(RecordOutcome::Skipped(SkipReason::Incomplete(reason)))
            }
        }
    }

    async fn sync_explicit(&self, task: &TaskRecord, date: &ExplicitDate) -> SyncResult<RecordOutcome> {
        let event = explicit_event(&task.title, date, self.options.timezone, task.color())?;

        let Some(linked_id) = task.linked_event_id.as_deref() else {
            let event_id = self.create(&event).await?;
            self.write_back(&task.id, &event_id).await?;
            return Ok(RecordOutcome::Created { event_id });
        };

        match self.update(linked_id, &event).await {
            Ok(event_id) => {
                if event_id != linked_id {
                    self.write_back(&task.id, &event_id).await?;
                }
                Ok(RecordOutcome::Updated { event_id })
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    page_id = %task.id,
                    event_id = %linked_id,
                    "Linked event no longer exists, creating a new one"
                );
                let event_id = self.create(&event).await?;
                self.write_back(&task.id, &event_id).await?;
                Ok(RecordOutcome::Recreated {
                    stale_id: linked_id.to_string(),
                    event_id,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn sync_recurring(
        &self,
        task: &TaskRecord,
        fields: RecurringFields<'_>,
        anchor: NaiveDate,
    ) -> SyncResult<RecordOutcome> {
        let time = match parse_time_slot(fields.time_slot) {
            Ok(time) => time,
            Err(e) => {
                warn!(page_id = %task.id, "{}, skipping page", e);
                return Ok(RecordOutcome::Skipped(SkipReason::InvalidTimeSlot(
                    fields.time_slot.to_string(),
                )));
            }
        };

        let duration = task.duration()?;
        let horizon = year_end_horizon(anchor);
        let targets: Vec<_> = if fields.frequency == Frequency::Daily {
            vec![None]
        } else {
            fields.days.iter().copied().map(Some).collect()
        };

        let mut created = 0;
        let mut failed = 0;
        let mut linked: Option<String> = None;
        let mut link_written = false;

        for target in targets {
            for date in occurrences(anchor, target, fields.frequency, horizon) {
                let occurrence = Occurrence { date, time };
                let created_id = match occurrence_event(
                    &task.title,
                    &occurrence,
                    duration,
                    self.options.timezone,
                    task.color(),
                ) {
                    Ok(event) => self.create(&event).await,
                    Err(e) => Err(e),
                };

                let event_id = match created_id {
                    Ok(id) => id,
                    Err(e) => {
                        error!(
                            page_id = %task.id,
                            title = %task.title,
                            date = %date,
                            "Failed to create calendar event: {}",
                            e
                        );
                        failed += 1;
                        continue;
                    }
                };
                created += 1;

                if !link_written {
                    link_written = true;
                    match self.write_back(&task.id, &event_id).await {
                        Ok(()) => linked = Some(event_id),
                        Err(e) => error!(
                            page_id = %task.id,
                            event_id = %event_id,
                            "Failed to write event id back: {}",
                            e
                        ),
                    }
                }
            }
        }

        if created == 0 && failed == 0 {
            info!(page_id = %task.id, title = %task.title, "No occurrences left this year");
            return Ok(RecordOutcome::Skipped(SkipReason::NoOccurrences));
        }

        info!(
            page_id = %task.id,
            title = %task.title,
            frequency = %fields.frequency,
            "Expanded recurring task: {} created, {} failed",
            created,
            failed
        );

        Ok(RecordOutcome::Expanded {
            created,
            failed,
            linked,
        })
    }

    async fn create(&self, event: &EventPayload) -> SyncResult<String> {
        if self.options.dry_run {
            info!("[DRY RUN] Would create event: {}", event);
            return Ok(format!("{}{}", DRY_RUN_ID_PREFIX, uuid::Uuid::new_v4()));
        }

        let event_id = self
            .calendar
            .create_event(&self.options.calendar_id, event)
            .await?;
        info!(event_id = %event_id, "Created event: {}", event);
        Ok(event_id)
    }

    async fn update(&self, event_id: &str, event: &EventPayload) -> SyncResult<String> {
        if self.options.dry_run {
            info!("[DRY RUN] Would update event {}: {}", event_id, event);
            return Ok(event_id.to_string());
        }

        let updated_id = self
            .calendar
            .update_event(&self.options.calendar_id, event_id, event)
            .await?;
        info!(event_id = %updated_id, "Updated event: {}", event);
        Ok(updated_id)
    }

    async fn write_back(&self, record_id: &str, event_id: &str) -> SyncResult<()> {
        if self.options.dry_run {
            info!("[DRY RUN] Would write event id {} to page {}", event_id, record_id);
            return Ok(());
        }

        self.store.write_linked_event_id(record_id, event_id).await?;
        info!(page_id = %record_id, event_id = %event_id, "Wrote event id to page");
        Ok(())
    }
}

impl From<IncompleteReason> for SkipReason {
    fn from(reason: IncompleteReason) -> Self {
        SkipReason::Incomplete(reason)
    }
}
