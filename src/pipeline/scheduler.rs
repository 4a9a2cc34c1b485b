// src/pipeline/scheduler.rs

//! Polling loop over group-sets.
//!
//! Each cycle picks one group-set in rotation, assembles a fresh snapshot
//! for every group of the set, diffs it against the cached previous one and
//! dispatches the resulting changes. The next cycle starts one interval
//! after the previous one started, or right away if the cycle overran.
//! Cycles never overlap and nothing inside a cycle can fail it: every
//! per-group and per-change problem ends up as a counter in [`CycleReport`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::{Instant, sleep_until};

use crate::error::Result;
use crate::models::{Config, Group, GroupSet, NotifyConfig, PollingConfig, change_fingerprint};
use crate::services::{ChangeFormatter, DispatchOutcome, DispatchRequest, NotificationDispatcher, SnapshotAssembler};
use crate::storage::SubscriberRegistry;

use super::cache::PollingCache;
use super::diff::{DiffWindow, SnapshotDiffer};

/// Advance a round-robin cursor over `len` items.
pub fn next_cursor(cursor: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (cursor + 1) % len }
}

/// When the cycle started at `started` lets the next one begin.
///
/// Measured from cycle start, so a cycle that overran finds its deadline
/// already passed and the next one begins as soon as it returns.
pub fn next_deadline(started: Instant, interval: Duration) -> Instant {
    started + interval
}

/// Group-sets visited in rotation, one per cycle.
#[derive(Debug, Clone)]
pub struct Scheduler {
    group_sets: Vec<GroupSet>,
    cursor: usize,
}

impl Scheduler {
    pub fn new(group_sets: Vec<GroupSet>) -> Self {
        Self {
            group_sets,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.group_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group_sets.is_empty()
    }

    /// The group-set the next cycle will poll.
    pub fn current(&self) -> Option<&GroupSet> {
        self.group_sets.get(self.cursor)
    }

    pub fn advance(&mut self) {
        self.cursor = next_cursor(self.cursor, self.group_sets.len());
    }
}

/// Outcome counters of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub set_index: usize,
    pub set_name: String,
    pub groups_polled: usize,
    /// Groups seen for the first time; their snapshot only seeded the cache
    pub cold_starts: usize,
    pub changes: usize,
    /// Changes dropped because their group has no subscribers
    pub skipped_no_subscribers: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub store_failures: usize,
    pub elapsed: Duration,
}

impl CycleReport {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Skipped => self.skipped_no_subscribers += 1,
            DispatchOutcome::Delivered { .. } => self.delivered += 1,
            DispatchOutcome::Failed { .. } => self.delivery_failures += 1,
        }
        if outcome.store_failed() {
            self.store_failures += 1;
        }
    }

    /// Emit the one-line cycle summary.
    pub fn log(&self) {
        log::info!(
            "Cycle [{}] {}: {} group(s), {} cold start(s), {} change(s), {} delivered, {} failed, {} unsubscribed, {} store error(s) in {:.2}s",
            self.set_index,
            self.set_name,
            self.groups_polled,
            self.cold_starts,
            self.changes,
            self.delivered,
            self.delivery_failures,
            self.skipped_no_subscribers,
            self.store_failures,
            self.elapsed.as_secs_f64()
        );
    }
}

/// Top-level polling loop; owns the only mutable state, the snapshot cache.
pub struct PollingScheduler {
    polling: PollingConfig,
    notify: NotifyConfig,
    offset: FixedOffset,
    rotation: Scheduler,
    assembler: SnapshotAssembler,
    cache: PollingCache,
    differ: SnapshotDiffer,
    formatter: ChangeFormatter,
    registry: Arc<dyn SubscriberRegistry>,
    dispatcher: NotificationDispatcher,
    next_start: Option<Instant>,
}

impl PollingScheduler {
    pub fn new(
        config: &Config,
        group_sets: Vec<GroupSet>,
        assembler: SnapshotAssembler,
        registry: Arc<dyn SubscriberRegistry>,
        dispatcher: NotificationDispatcher,
    ) -> Result<Self> {
        Ok(Self {
            polling: config.polling.clone(),
            notify: config.notify.clone(),
            offset: config.feed.offset()?,
            rotation: Scheduler::new(group_sets),
            assembler,
            cache: PollingCache::new(),
            differ: SnapshotDiffer::new(),
            formatter: ChangeFormatter::from_config(&config.notify),
            registry,
            dispatcher,
            next_start: None,
        })
    }

    pub fn rotation(&self) -> &Scheduler {
        &self.rotation
    }

    pub fn cache(&self) -> &PollingCache {
        &self.cache
    }

    /// Run cycles forever, one interval apart measured from cycle start.
    pub async fn run(&mut self) {
        log::info!(
            "Polling {} group-set(s) every {}s",
            self.rotation.len(),
            self.polling.interval_secs
        );

        loop {
            self.paced_cycle().await.log();
        }
    }

    /// Run `count` paced cycles and return their reports.
    pub async fn run_cycles(&mut self, count: usize) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(count);
        for _ in 0..count {
            let report = self.paced_cycle().await;
            report.log();
            reports.push(report);
        }
        reports
    }

    /// Wait for the previous cycle's deadline, then run one cycle.
    async fn paced_cycle(&mut self) -> CycleReport {
        if let Some(deadline) = self.next_start {
            sleep_until(deadline).await;
        }
        let started = Instant::now();
        let report = self.run_cycle().await;
        self.next_start = Some(next_deadline(
            started,
            Duration::from_secs(self.polling.interval_secs),
        ));
        report
    }

    /// Run one cycle at the current time.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let now = Utc::now().with_timezone(&self.offset);
        self.run_cycle_at(now).await
    }

    /// Run one cycle as if the current time were `now`.
    pub async fn run_cycle_at(&mut self, now: DateTime<FixedOffset>) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            set_index: self.rotation.cursor(),
            ..CycleReport::default()
        };

        let Some(set) = self.rotation.current().cloned() else {
            log::warn!("No group-sets registered, nothing to poll");
            return report;
        };
        report.set_name = set.name.clone();
        report.groups_polled = set.groups.len();

        // Fetching
        let assembler = &self.assembler;
        let assembled: Vec<_> = stream::iter(&set.groups)
            .map(|group| async move {
                let snapshot = assembler.assemble(&group.id, &group.feeds).await;
                (group, Arc::new(snapshot))
            })
            .buffer_unordered(self.polling.max_concurrent_groups.max(1))
            .collect()
            .await;

        // Diffing
        let window = DiffWindow::starting_today(now, self.polling.forward_days);
        let mut requests = Vec::new();

        for (group, current) in assembled {
            let Some(previous) = self.cache.replace(&group.id, current.clone()) else {
                log::info!(
                    "Group {} seeded with {} event(s)",
                    group.id,
                    current.event_count()
                );
                report.cold_starts += 1;
                continue;
            };

            let changes = self.differ.diff(&previous, &current, &window);
            if changes.is_empty() {
                continue;
            }
            report.changes += changes.len();

            let destinations = self.destinations(group).await;
            if destinations.is_empty() {
                log::debug!(
                    "Group {} has {} change(s) but no subscribers",
                    group.id,
                    changes.len()
                );
                report.skipped_no_subscribers += changes.len();
                continue;
            }

            let title = self.notify.title_for(&group.id, &group.name);
            for change in &changes {
                let formatted = self.formatter.format(change);
                requests.push(DispatchRequest {
                    group_id: group.id.clone(),
                    kind: change.kind(),
                    fingerprint: change_fingerprint(&group.id, change),
                    destinations: destinations.clone(),
                    title: title.clone(),
                    body: formatted.text,
                    icon: formatted.icon,
                    action: formatted.action,
                });
            }
        }

        // Dispatching
        let dispatcher = &self.dispatcher;
        let outcomes: Vec<DispatchOutcome> = stream::iter(requests)
            .map(|request| dispatcher.dispatch(request))
            .buffer_unordered(self.notify.max_concurrent.max(1))
            .collect()
            .await;

        for outcome in &outcomes {
            report.record(outcome);
        }

        self.rotation.advance();
        report.elapsed = started.elapsed();
        report
    }

    /// Registry lookup; an error counts as no subscribers.
    async fn destinations(&self, group: &Group) -> Vec<String> {
        match self.registry.destinations(&group.id).await {
            Ok(destinations) => destinations,
            Err(error) => {
                log::warn!("Subscriber lookup failed for group {}: {}", group.id, error);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Event, EventKind, NotificationRecord, PushMessage, UNKNOWN_TEACHER};
    use crate::services::FeedSource;
    use crate::storage::{NotificationStore, PushTransport};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        feeds: Mutex<HashMap<String, Vec<Event>>>,
        failing: Mutex<HashSet<String>>,
    }

    impl FakeSource {
        fn set(&self, feed_id: &str, events: Vec<Event>) {
            self.feeds.lock().unwrap().insert(feed_id.to_string(), events);
        }

        fn fail(&self, feed_id: &str) {
            self.failing.lock().unwrap().insert(feed_id.to_string());
        }
    }

    #[async_trait]
    impl FeedSource for FakeSource {
        async fn fetch(&self, feed_id: &str) -> Result<Vec<Event>> {
            if self.failing.lock().unwrap().contains(feed_id) {
                return Err(AppError::feed(feed_id, "503 Service Unavailable"));
            }
            Ok(self.feeds.lock().unwrap().get(feed_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MemoryRegistry {
        subscribers: HashMap<String, Vec<String>>,
        broken: bool,
    }

    #[async_trait]
    impl SubscriberRegistry for MemoryRegistry {
        async fn destinations(&self, group_id: &str) -> Result<Vec<String>> {
            if self.broken {
                return Err(AppError::store("registry unavailable"));
            }
            Ok(self.subscribers.get(group_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<PushMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl PushTransport for RecordingTransport {
        async fn send(&self, message: &PushMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(AppError::transport("gateway down"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<NotificationRecord>>,
    }

    #[async_trait]
    impl NotificationStore for MemoryStore {
        async fn save(&self, record: &NotificationRecord) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Harness {
        scheduler: PollingScheduler,
        source: Arc<FakeSource>,
        transport: Arc<RecordingTransport>,
        store: Arc<MemoryStore>,
    }

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        offset().with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap()
    }

    fn make_event(uid: &str, summary: &str, hour: u32) -> Event {
        let start = offset().with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap();
        Event {
            uid: uid.to_string(),
            start,
            end: start + chrono::Duration::hours(2),
            summary: summary.to_string(),
            location: "A101".into(),
            teacher: UNKNOWN_TEACHER.into(),
            kind: EventKind::Class,
        }
    }

    fn group(id: &str, feeds: &[&str]) -> Group {
        Group {
            id: id.to_string(),
            name: id.to_uppercase(),
            feeds: feeds.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn sets() -> Vec<GroupSet> {
        vec![
            GroupSet {
                name: "sciences".into(),
                groups: vec![group("g1", &["f1", "f2"])],
            },
            GroupSet {
                name: "letters".into(),
                groups: vec![group("g2", &["f3"])],
            },
        ]
    }

    fn harness(sets: Vec<GroupSet>, registry: MemoryRegistry, transport: RecordingTransport) -> Harness {
        let source = Arc::new(FakeSource::default());
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryStore::default());

        let assembler = SnapshotAssembler::new(source.clone(), 2);
        let dispatcher = NotificationDispatcher::new(transport.clone(), store.clone());
        let scheduler = PollingScheduler::new(
            &Config::default(),
            sets,
            assembler,
            Arc::new(registry),
            dispatcher,
        )
        .unwrap();

        Harness {
            scheduler,
            source,
            transport,
            store,
        }
    }

    fn subscribed(group_id: &str) -> MemoryRegistry {
        MemoryRegistry {
            subscribers: HashMap::from([(group_id.to_string(), vec!["t1".into(), "t2".into()])]),
            broken: false,
        }
    }

    fn single_set() -> Vec<GroupSet> {
        sets().into_iter().take(1).collect()
    }

    #[test]
    fn test_next_cursor_wraps() {
        assert_eq!(next_cursor(0, 3), 1);
        assert_eq!(next_cursor(1, 3), 2);
        assert_eq!(next_cursor(2, 3), 0);
        assert_eq!(next_cursor(0, 1), 0);
        assert_eq!(next_cursor(4, 0), 0);
    }

    #[test]
    fn test_rotation_visits_sets_in_order() {
        let mut rotation = Scheduler::new(sets());
        let mut visited = Vec::new();
        for _ in 0..3 {
            visited.push(rotation.current().unwrap().name.clone());
            rotation.advance();
        }
        assert_eq!(visited, vec!["sciences", "letters", "sciences"]);
    }

    #[tokio::test]
    async fn test_cycles_rotate_across_sets() {
        let mut h = harness(sets(), MemoryRegistry::default(), RecordingTransport::default());

        let first = h.scheduler.run_cycle_at(now()).await;
        let second = h.scheduler.run_cycle_at(now()).await;
        let third = h.scheduler.run_cycle_at(now()).await;

        assert_eq!((first.set_index, first.set_name.as_str()), (0, "sciences"));
        assert_eq!((second.set_index, second.set_name.as_str()), (1, "letters"));
        assert_eq!((third.set_index, third.set_name.as_str()), (0, "sciences"));
        assert_eq!(h.scheduler.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_cold_start_seeds_silently() {
        let mut h = harness(single_set(), subscribed("g1"), RecordingTransport::default());
        h.source.set("f1", vec![make_event("A", "Math", 9)]);

        let report = h.scheduler.run_cycle_at(now()).await;

        assert_eq!(report.cold_starts, 1);
        assert_eq!(report.changes, 0);
        assert!(h.transport.sent.lock().unwrap().is_empty());
        assert_eq!(h.scheduler.cache().get("g1").unwrap().event_count(), 1);
    }

    #[tokio::test]
    async fn test_changes_are_dispatched_per_change() {
        let mut h = harness(single_set(), subscribed("g1"), RecordingTransport::default());
        h.source.set("f1", vec![make_event("A", "Math", 9)]);
        h.scheduler.run_cycle_at(now()).await;

        h.source.set("f1", vec![make_event("B", "Physics", 9)]);
        let report = h.scheduler.run_cycle_at(now()).await;

        assert_eq!(report.changes, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.delivery_failures, 0);

        let sent = h.transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.destinations == vec!["t1", "t2"]));
        assert!(sent.iter().all(|m| m.title == "Schedule update - G1"));

        let mut bodies: Vec<&str> = sent.iter().map(|m| m.body.as_str()).collect();
        bodies.sort();
        assert_eq!(
            bodies,
            vec![
                "Addition of 'Physics' on 04/03/2024 at 09:00",
                "Removal of 'Math' on 04/03/2024 at 09:00",
            ]
        );
        assert_eq!(h.store.records.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_subscribers_skips_dispatch() {
        let mut h = harness(single_set(), MemoryRegistry::default(), RecordingTransport::default());
        h.source.set("f1", vec![make_event("A", "Math", 9)]);
        h.scheduler.run_cycle_at(now()).await;

        h.source.set("f1", vec![make_event("B", "Physics", 9)]);
        let report = h.scheduler.run_cycle_at(now()).await;

        assert_eq!(report.changes, 2);
        assert_eq!(report.skipped_no_subscribers, 2);
        assert!(h.transport.sent.lock().unwrap().is_empty());
        assert!(h.store.records.lock().unwrap().is_empty());

        // The cache moved on anyway, so the same changes are not seen again.
        let report = h.scheduler.run_cycle_at(now()).await;
        assert_eq!(report.changes, 0);
    }

    #[tokio::test]
    async fn test_registry_error_counts_as_no_subscribers() {
        let registry = MemoryRegistry {
            broken: true,
            ..subscribed("g1")
        };
        let mut h = harness(single_set(), registry, RecordingTransport::default());
        h.source.set("f1", vec![make_event("A", "Math", 9)]);
        h.scheduler.run_cycle_at(now()).await;

        h.source.set("f1", vec![]);
        let report = h.scheduler.run_cycle_at(now()).await;

        assert_eq!(report.changes, 1);
        assert_eq!(report.skipped_no_subscribers, 1);
        assert!(h.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_feed_falls_back_to_last_good() {
        let mut h = harness(single_set(), subscribed("g1"), RecordingTransport::default());
        h.source.set("f1", vec![make_event("A", "Math", 9)]);
        h.source.set("f2", vec![make_event("B", "Physics", 14)]);
        h.scheduler.run_cycle_at(now()).await;

        h.source.fail("f2");
        let report = h.scheduler.run_cycle_at(now()).await;

        assert_eq!(report.changes, 0);
        let cached = h.scheduler.cache().get("g1").unwrap();
        let uids: Vec<&str> = cached.events().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_delivery_failures_are_isolated() {
        let transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };
        let mut h = harness(single_set(), subscribed("g1"), transport);
        h.source.set("f1", vec![make_event("A", "Math", 9), make_event("B", "Physics", 11)]);
        h.scheduler.run_cycle_at(now()).await;

        h.source.set("f1", vec![]);
        let report = h.scheduler.run_cycle_at(now()).await;

        assert_eq!(report.changes, 2);
        assert_eq!(report.delivery_failures, 2);
        assert_eq!(report.delivered, 0);
        assert_eq!(h.transport.sent.lock().unwrap().len(), 2);

        let records = h.store.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.delivered));

        // An empty poll still replaces the cached snapshot.
        assert!(h.scheduler.cache().get("g1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_rotation_reports_nothing() {
        let mut h = harness(Vec::new(), MemoryRegistry::default(), RecordingTransport::default());
        let report = h.scheduler.run_cycle_at(now()).await;
        assert_eq!(report.groups_polled, 0);
        assert_eq!(h.scheduler.rotation().cursor(), 0);
    }

    /// Source whose fetches take a scripted amount of (paused) time.
    struct SlowSource {
        delays: Mutex<VecDeque<Duration>>,
        spans: Mutex<Vec<(Instant, Instant)>>,
    }

    #[async_trait]
    impl FeedSource for SlowSource {
        async fn fetch(&self, _feed_id: &str) -> Result<Vec<Event>> {
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
            let begin = Instant::now();
            tokio::time::sleep(delay).await;
            self.spans.lock().unwrap().push((begin, Instant::now()));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_next_deadline_counts_from_cycle_start() {
        let started = Instant::now();
        let interval = Duration::from_secs(60);
        assert_eq!(next_deadline(started, interval), started + interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_are_paced_from_start_and_never_overlap() {
        let source = Arc::new(SlowSource {
            delays: Mutex::new(VecDeque::from([
                Duration::from_secs(90),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ])),
            spans: Mutex::new(Vec::new()),
        });
        let dispatcher = NotificationDispatcher::new(
            Arc::new(RecordingTransport::default()),
            Arc::new(MemoryStore::default()),
        );
        let mut scheduler = PollingScheduler::new(
            &Config::default(),
            single_set()
                .into_iter()
                .map(|set| GroupSet {
                    groups: vec![group("g1", &["f1"])],
                    ..set
                })
                .collect(),
            SnapshotAssembler::new(source.clone(), 1),
            Arc::new(MemoryRegistry::default()),
            dispatcher,
        )
        .unwrap();

        let origin = Instant::now();
        let reports = scheduler.run_cycles(3).await;
        assert_eq!(reports.len(), 3);

        let interval = Duration::from_secs(Config::default().polling.interval_secs);
        let spans = source.spans.lock().unwrap().clone();
        let starts: Vec<Duration> = spans.iter().map(|(begin, _)| *begin - origin).collect();

        // First cycle overran (90s > 60s): the second starts as soon as it ends.
        // The second finished early: the third waits for start + interval.
        assert_eq!(
            starts,
            vec![
                Duration::ZERO,
                Duration::from_secs(90),
                Duration::from_secs(90) + interval,
            ]
        );
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
    }
}
