//! Batch driver: pulls every task record and reconciles them one at a time.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::error::SyncResult;
use crate::provider::{CalendarService, TaskStore};
use crate::reconcile::{Reconciler, RecordOutcome, SyncOptions};
use crate::task::TaskRecord;

/// Pause between records, keeping under the calendar's request-rate ceiling.
pub const DEFAULT_RECORD_DELAY: Duration = Duration::from_millis(200);

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Records reconciled (skips included).
    pub total: usize,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub events_created: usize,
    pub events_updated: usize,
    /// Set when the run stopped early on an interrupt.
    pub interrupted: bool,
}

impl SyncStats {
    fn record(&mut self, outcome: &SyncResult<RecordOutcome>) {
        self.total += 1;
        match outcome {
            Ok(outcome) if outcome.is_failure() => self.failed += 1,
            Ok(RecordOutcome::Skipped(_)) => self.skipped += 1,
            Ok(outcome) => {
                self.synced += 1;
                self.events_created += outcome.events_created();
                self.events_updated += outcome.events_updated();
            }
            Err(_) => self.failed += 1,
        }
    }

    /// Successes include skipped records, which were processed as intended.
    pub fn succeeded(&self) -> usize {
        self.synced + self.skipped
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed: {} synced, {} skipped, {} failed ({} events created, {} updated)",
            self.total, self.synced, self.skipped, self.failed, self.events_created, self.events_updated
        )
    }
}

/// Pull every record of a database, following pagination until exhausted.
pub async fn fetch_all<S>(store: &S, database_id: &str) -> SyncResult<Vec<TaskRecord>>
where
    S: TaskStore + ?Sized,
{
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.query(database_id, cursor.as_deref()).await?;
        records.extend(page.records);

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            (true, None) => {
                warn!("Task query reported more results without a cursor, stopping");
                break;
            }
            (false, _) => break,
        }
    }

    info!("Queried task database: {} pages found", records.len());
    Ok(records)
}

pub struct SyncDriver<'a, S: ?Sized, C: ?Sized> {
    store: &'a S,
    calendar: &'a C,
    options: SyncOptions,
    max_records: Option<usize>,
    delay: Duration,
    interrupt: Arc<AtomicBool>,
}

impl<'a, S, C> SyncDriver<'a, S, C>
where
    S: TaskStore + ?Sized,
    C: CalendarService + ?Sized,
{
    pub fn new(store: &'a S, calendar: &'a C, options: SyncOptions) -> Self {
        SyncDriver {
            store,
            calendar,
            options,
            max_records: None,
            delay: DEFAULT_RECORD_DELAY,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process at most `max` records.
    pub fn max_records(mut self, max: Option<usize>) -> Self {
        self.max_records = max;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Flag checked before each record starts; once set, the run stops.
    pub fn interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Fetch all records from `database_id` and reconcile them.
    pub async fn sync_database(&self, database_id: &str, anchor: NaiveDate) -> SyncResult<SyncStats> {
        let records = fetch_all(self.store, database_id).await?;
        Ok(self.run(records, anchor).await)
    }

    /// Reconcile `records` in order. Individual failures are logged and
    /// counted; they never abort the batch.
    pub async fn run(&self, mut records: Vec<TaskRecord>, anchor: NaiveDate) -> SyncStats {
        if let Some(max) = self.max_records {
            records.truncate(max);
        }

        let reconciler = Reconciler::new(self.store, self.calendar, &self.options);
        let mut stats = SyncStats::default();
        let total = records.len();
        info!("Processing {} pages", total);

        for (i, record) in records.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if self.interrupt.load(Ordering::SeqCst) {
                warn!("Interrupted, {} of {} pages left unprocessed", total - i, total);
                stats.interrupted = true;
                break;
            }

            info!("Processing page {}/{}", i + 1, total);
            let outcome = reconciler.reconcile(record, anchor).await;
            if let Err(e) = &outcome {
                error!(page_id = %record.id, title = %record.title, "Error syncing page: {}", e);
            }
            stats.record(&outcome);
        }

        info!("Sync finished: {}", stats);
        stats
    }

    /// Read a single record by id and reconcile it.
    pub async fn run_one(&self, record_id: &str, anchor: NaiveDate) -> SyncResult<RecordOutcome> {
        let record = self.store.read_record(record_id).await?;
        let reconciler = Reconciler::new(self.store, self.calendar, &self.options);
        reconciler.reconcile(&record, anchor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ExplicitDate, Frequency};
    use crate::testing::{FakeCalendar, FakeStore};
    use chrono::Weekday;
    use chrono_tz::America::New_York;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 29).unwrap()
    }

    fn options() -> SyncOptions {
        SyncOptions {
            calendar_id: "primary".to_string(),
            timezone: New_York,
            dry_run: false,
        }
    }

    fn dated(id: &str, start: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: format!("Task {}", id),
            explicit_date: Some(ExplicitDate {
                start: start.to_string(),
                end: None,
            }),
            ..Default::default()
        }
    }

    fn daily(id: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: "Stretch".to_string(),
            days_of_week: vec![Weekday::Mon],
            time_slot: Some("0700".to_string()),
            frequency: Some(Frequency::Daily),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_all_follows_cursors_in_order() {
        let records: Vec<_> = (0..5).map(|i| dated(&format!("p{}", i), "2025-12-30")).collect();
        let store = FakeStore::paged(records, 2);

        let fetched = fetch_all(&store, "db").await.unwrap();

        let ids: Vec<_> = fetched.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2", "p3", "p4"]);
        assert_eq!(
            store.queries(),
            vec![None, Some("cursor-1".to_string()), Some("cursor-2".to_string())]
        );
    }

    #[tokio::test]
    async fn batch_counts_and_continues_past_failures() {
        let store = FakeStore::default();
        let calendar = FakeCalendar::default();
        let records = vec![
            dated("good", "2025-12-30"),
            dated("bad-date", "someday"),
            TaskRecord {
                id: "empty".to_string(),
                title: "Nothing".to_string(),
                ..Default::default()
            },
            daily("daily"),
        ];

        let stats = SyncDriver::new(&store, &calendar, options())
            .delay(Duration::ZERO)
            .run(records, anchor())
            .await;

        assert_eq!(
            stats,
            SyncStats {
                total: 4,
                synced: 2,
                skipped: 1,
                failed: 1,
                events_created: 4,
                events_updated: 0,
                interrupted: false,
            }
        );
        assert_eq!(stats.succeeded(), 3);
    }

    #[tokio::test]
    async fn max_records_truncates() {
        let store = FakeStore::default();
        let calendar = FakeCalendar::default();
        let records: Vec<_> = (0..4).map(|i| dated(&format!("p{}", i), "2025-12-30")).collect();

        let stats = SyncDriver::new(&store, &calendar, options())
            .delay(Duration::ZERO)
            .max_records(Some(2))
            .run(records, anchor())
            .await;

        assert_eq!(stats.total, 2);
        assert_eq!(calendar.creates(), 2);
    }

    #[tokio::test]
    async fn interrupt_stops_before_next_record() {
        let store = FakeStore::default();
        let calendar = FakeCalendar::default();
        let flag = Arc::new(AtomicBool::new(true));

        let stats = SyncDriver::new(&store, &calendar, options())
            .delay(Duration::ZERO)
            .interrupt_flag(flag)
            .run(vec![dated("p0", "2025-12-30")], anchor())
            .await;

        assert!(stats.interrupted);
        assert_eq!(stats.total, 0);
        assert!(calendar.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_during_delay_stops_before_next_record() {
        let store = FakeStore::default();
        let calendar = FakeCalendar::default();
        let flag = Arc::new(AtomicBool::new(false));
        let records = vec![dated("p0", "2025-12-30"), dated("p1", "2025-12-31")];

        let setter = flag.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEFAULT_RECORD_DELAY / 2).await;
            setter.store(true, Ordering::SeqCst);
        });

        let stats = SyncDriver::new(&store, &calendar, options())
            .interrupt_flag(flag)
            .run(records, anchor())
            .await;

        assert!(stats.interrupted);
        assert_eq!(stats.total, 1);
        assert_eq!(calendar.creates(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_between_records() {
        let store = FakeStore::default();
        let calendar = FakeCalendar::default();
        let records: Vec<_> = (0..3).map(|i| dated(&format!("p{}", i), "2025-12-30")).collect();
        let started = tokio::time::Instant::now();

        SyncDriver::new(&store, &calendar, options())
            .run(records, anchor())
            .await;

        assert_eq!(started.elapsed(), DEFAULT_RECORD_DELAY * 2);
    }

    #[tokio::test]
    async fn sync_database_skips_and_reports_processed() {
        let mut no_days = daily("no-days");
        no_days.days_of_week.clear();
        let store = FakeStore::paged(vec![no_days], 10);
        let calendar = FakeCalendar::default();

        let stats = SyncDriver::new(&store, &calendar, options())
            .delay(Duration::ZERO)
            .sync_database("db", anchor())
            .await
            .unwrap();

        assert_eq!(stats.total, 1);
        assert_eq!(stats.skipped, 1);
        assert!(calendar.calls().is_empty());
    }

    #[tokio::test]
    async fn run_one_reads_the_record() {
        let store = FakeStore::default().with_record(dated("single", "2025-12-30"));
        let calendar = FakeCalendar::default();
        let driver = SyncDriver::new(&store, &calendar, options());

        let outcome = driver.run_one("single", anchor()).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Created { event_id: "evt-1".to_string() });
        assert!(driver.run_one("missing", anchor()).await.is_err());
    }
}
