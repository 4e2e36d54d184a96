//! Interfaces to the external task database and calendar service.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::event::EventPayload;
use crate::task::TaskRecord;

/// One page of a paginated task query.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<TaskRecord>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Source of task records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fetch one page of records, starting at `cursor` when given.
    async fn query(&self, database_id: &str, cursor: Option<&str>) -> SyncResult<RecordPage>;

    async fn read_record(&self, record_id: &str) -> SyncResult<TaskRecord>;

    /// Store the back-reference to the calendar event on the record.
    async fn write_linked_event_id(&self, record_id: &str, event_id: &str) -> SyncResult<()>;
}

/// Calendar that events are written to.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create an event and return its id.
    async fn create_event(&self, calendar_id: &str, event: &EventPayload) -> SyncResult<String>;

    /// Replace an existing event and return its id. Fails with
    /// `SyncError::NotFound` when `event_id` no longer exists.
    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventPayload,
    ) -> SyncResult<String>;
}
