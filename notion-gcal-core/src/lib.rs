//! Core logic for one-way Notion to Google Calendar sync.
//!
//! This crate has no knowledge of either service's wire format:
//! - `task` and `event` hold the typed records and event descriptions
//! - `time_slot`, `occurrence` and `materialize` turn recurring tasks into events
//! - `reconcile` decides between create, update and expansion per record
//! - `sync` drives a whole batch
//! - `provider` defines the traits the concrete clients implement

pub mod error;
pub mod event;
pub mod materialize;
pub mod occurrence;
pub mod provider;
pub mod reconcile;
pub mod sync;
pub mod task;
pub mod time_slot;

#[cfg(test)]
mod testing;

pub use error::{SyncError, SyncResult};
pub use event::{EventColor, EventPayload, EventTime};
pub use provider::{CalendarService, RecordPage, TaskStore};
pub use reconcile::{Reconciler, RecordOutcome, SkipReason, SyncOptions};
pub use sync::{SyncDriver, SyncStats};
pub use task::{ExplicitDate, Frequency, Priority, TaskRecord};
