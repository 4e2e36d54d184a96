//! In-memory task store and calendar used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};
use crate::event::EventPayload;
use crate::provider::{CalendarService, RecordPage, TaskStore};
use crate::task::TaskRecord;

#[derive(Debug, Clone)]
pub enum CalendarCall {
    Create(EventPayload),
    Update { event_id: String },
}

/// Calendar that hands out ids `evt-1`, `evt-2`, ... per create attempt.
#[derive(Default)]
pub struct FakeCalendar {
    calls: Mutex<Vec<CalendarCall>>,
    existing: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
    fail_create_at: Option<usize>,
    fail_updates: bool,
}

impl FakeCalendar {
    pub fn with_existing(self, event_id: &str) -> Self {
        self.existing.lock().unwrap().insert(event_id.to_string());
        self
    }

    /// Fail the create attempt with this zero-based index.
    pub fn failing_create_at(mut self, index: usize) -> Self {
        self.fail_create_at = Some(index);
        self
    }

    /// Fail every update of an existing event with a provider error.
    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn calls(&self) -> Vec<CalendarCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CalendarCall::Create(_)))
            .count()
    }

    pub fn updates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CalendarCall::Update { .. }))
            .count()
    }
}

#[async_trait]
impl CalendarService for FakeCalendar {
    async fn create_event(&self, _calendar_id: &str, event: &EventPayload) -> SyncResult<String> {
        self.calls.lock().unwrap().push(CalendarCall::Create(event.clone()));
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_create_at == Some(attempt) {
            return Err(SyncError::Provider("rate limited".to_string()));
        }

        let id = format!("evt-{}", attempt + 1);
        self.existing.lock().unwrap().insert(id.clone());
        Ok(id)
    }

    async fn update_event(
        &self,
        _calendar_id: &str,
        event_id: &str,
        _event: &EventPayload,
    ) -> SyncResult<String> {
        self.calls.lock().unwrap().push(CalendarCall::Update {
            event_id: event_id.to_string(),
        });

        if !self.existing.lock().unwrap().contains(event_id) {
            return Err(SyncError::NotFound(format!("event {}", event_id)));
        }
        if self.fail_updates {
            return Err(SyncError::Provider("permission denied".to_string()));
        }
        Ok(event_id.to_string())
    }
}

/// Task store serving pre-built pages. The cursor for page `n` is `cursor-n`.
#[derive(Default)]
pub struct FakeStore {
    pages: Vec<RecordPage>,
    records: HashMap<String, TaskRecord>,
    queries: Mutex<Vec<Option<String>>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    /// Split `records` into pages of `page_size`.
    pub fn paged(records: Vec<TaskRecord>, page_size: usize) -> Self {
        let chunks: Vec<Vec<TaskRecord>> = records
            .chunks(page_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        let count = chunks.len();

        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(i, records)| RecordPage {
                records,
                has_more: i + 1 < count,
                next_cursor: (i + 1 < count).then(|| format!("cursor-{}", i + 1)),
            })
            .collect();

        FakeStore {
            pages,
            ..Default::default()
        }
    }

    pub fn with_record(mut self, record: TaskRecord) -> Self {
        self.records.insert(record.id.clone(), record);
        self
    }

    pub fn queries(&self) -> Vec<Option<String>> {
        self.queries.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskStore for FakeStore {
    async fn query(&self, _database_id: &str, cursor: Option<&str>) -> SyncResult<RecordPage> {
        self.queries.lock().unwrap().push(cursor.map(str::to_string));

        let index = match cursor {
            None => 0,
            Some(c) => c
                .strip_prefix("cursor-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| SyncError::Provider(format!("bad cursor {}", c)))?,
        };

        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn read_record(&self, record_id: &str) -> SyncResult<TaskRecord> {
        self.records
            .get(record_id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("page {}", record_id)))
    }

    async fn write_linked_event_id(&self, record_id: &str, event_id: &str) -> SyncResult<()> {
        self.writes
            .lock()
            .unwrap()
            .push((record_id.to_string(), event_id.to_string()));
        Ok(())
    }
}
