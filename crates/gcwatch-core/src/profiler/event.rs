//! Event-driven profiler: buffers one record per completed collection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::report::{self, ReportConfig};
use super::Profiler;
use crate::capability::ProfilerKind;
use crate::error::{Error, Result};
use crate::telemetry::{CollectionListener, GcNotification, SubscriptionId, TelemetryProvider};

/// One completed collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcEvent {
    /// Runtime-assigned sequence id, increasing within a collector.
    pub id: u64,
    pub collector_name: String,
    pub start_time_nanos: u64,
    pub duration_nanos: u64,
    /// Used bytes per pool before the cycle.
    pub used_before: BTreeMap<String, i64>,
    /// Used bytes per pool after the cycle.
    pub used_after: BTreeMap<String, i64>,
    /// Committed bytes per pool after the cycle.
    pub committed_after: BTreeMap<String, i64>,
}

/// Memory accounted to one event, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventMemory {
    pub before: i64,
    pub after: i64,
    pub committed: i64,
}

impl GcEvent {
    pub fn from_notification(n: GcNotification) -> Self {
        Self {
            id: n.sequence_id,
            collector_name: n.collector_name,
            start_time_nanos: n.start_time_nanos,
            duration_nanos: n.duration_nanos,
            used_before: n
                .usage_before
                .iter()
                .map(|(name, u)| (name.clone(), u.used))
                .collect(),
            used_after: n
                .usage_after
                .iter()
                .map(|(name, u)| (name.clone(), u.used))
                .collect(),
            committed_after: n
                .usage_after
                .into_iter()
                .map(|(name, u)| (name, u.committed))
                .collect(),
        }
    }

    pub fn start_secs(&self) -> f64 {
        self.start_time_nanos as f64 / 1_000_000_000.0
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_nanos as f64 / 1_000_000.0
    }

    /// Sums the pools present after the cycle.
    ///
    /// A pool reported only before the cycle is not counted; a pool reported
    /// only after it counts as zero bytes before.
    pub fn memory(&self) -> EventMemory {
        let mut mem = EventMemory::default();
        for (name, used) in &self.used_after {
            mem.before += self.used_before.get(name).copied().unwrap_or(0);
            mem.after += used;
            mem.committed += self.committed_after.get(name).copied().unwrap_or(0);
        }
        mem
    }
}

/// Listener shared with the runtime; appends every notification.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<GcEvent>>,
}

impl EventLog {
    fn events(&self) -> MutexGuard<'_, Vec<GcEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the buffer taken under the lock.
    pub fn snapshot(&self) -> Vec<GcEvent> {
        self.events().clone()
    }

    pub fn total_duration_nanos(&self) -> u64 {
        self.events().iter().map(|e| e.duration_nanos).sum()
    }

    pub fn clear(&self) {
        self.events().clear();
    }
}

impl CollectionListener for EventLog {
    fn on_collection(&self, notification: GcNotification) {
        let event = GcEvent::from_notification(notification);
        self.events().push(event);
    }
}

/// Profiler for runtimes that deliver per-collection notifications.
pub struct EventDrivenProfiler<P: TelemetryProvider> {
    provider: P,
    config: ReportConfig,
    listener: Option<Arc<EventLog>>,
    subscriptions: Vec<(String, SubscriptionId)>,
}

impl<P: TelemetryProvider> EventDrivenProfiler<P> {
    pub fn new(provider: P, config: ReportConfig) -> Self {
        Self {
            provider,
            config,
            listener: None,
            subscriptions: Vec::new(),
        }
    }

    /// Whether the listener is currently attached to the runtime.
    pub fn is_subscribed(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Copy of the buffered events.
    pub fn events(&self) -> Vec<GcEvent> {
        self.listener
            .as_ref()
            .map(|l| l.snapshot())
            .unwrap_or_default()
    }

    /// Event count per collector, in order of first appearance.
    pub fn summary(&self) -> Vec<(String, usize)> {
        report::summarize(&self.events())
    }

    fn unsubscribe_all(&mut self) {
        for (collector, id) in self.subscriptions.drain(..) {
            if let Err(e) = self.provider.unsubscribe(&collector, id) {
                warn!("Failed to unsubscribe from '{}': {}", collector, e);
            }
        }
    }
}

impl<P: TelemetryProvider> Profiler for EventDrivenProfiler<P> {
    fn kind(&self) -> ProfilerKind {
        ProfilerKind::EventDriven
    }

    /// Attaches the listener to every collector.
    ///
    /// Already-subscribed profilers are left untouched. If any subscription
    /// fails, the ones made so far are rolled back.
    fn enable(&mut self) -> Result<()> {
        let listener = Arc::clone(self.listener.get_or_insert_with(Default::default));
        if self.is_subscribed() {
            debug!("GC profiler already enabled");
            return Ok(());
        }

        for collector in self.provider.list_collectors() {
            let dyn_listener: Arc<dyn CollectionListener> = listener.clone();
            match self.provider.subscribe(&collector.name, dyn_listener) {
                Ok(id) => {
                    debug!("Subscribed to '{}' ({:?})", collector.name, id);
                    self.subscriptions.push((collector.name, id));
                }
                Err(source) => {
                    self.unsubscribe_all();
                    return Err(Error::Subscription {
                        collector: collector.name,
                        source,
                    });
                }
            }
        }

        info!(
            "GC profiler enabled (event-driven, {} collectors)",
            self.subscriptions.len()
        );
        Ok(())
    }

    /// Detaches from every collector. Buffered events are kept.
    fn disable(&mut self) {
        let n = self.subscriptions.len();
        self.unsubscribe_all();
        info!("GC profiler disabled ({} subscriptions released)", n);
    }

    fn clear(&mut self) {
        if let Some(listener) = &self.listener {
            listener.clear();
        }
    }

    /// True once a listener exists, even after `disable`.
    fn is_enabled(&self) -> bool {
        self.listener.is_some()
    }

    fn result(&self) -> Option<String> {
        Some(report::render(&self.events(), &self.config))
    }

    fn total_time(&self) -> f64 {
        let nanos = self
            .listener
            .as_ref()
            .map_or(0, |l| l.total_duration_nanos());
        nanos as f64 / 1_000_000_000.0
    }
}

impl<P: TelemetryProvider> Drop for EventDrivenProfiler<P> {
    fn drop(&mut self) {
        if self.is_subscribed() {
            debug!("Releasing {} GC subscriptions on drop", self.subscriptions.len());
            self.unsubscribe_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MemoryUsage, MockRuntime};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn notification(id: u64, collector: &str, duration_ms: u64) -> GcNotification {
        GcNotification {
            sequence_id: id,
            collector_name: collector.to_string(),
            start_time_nanos: id * 1_000_000_000,
            usage_before: BTreeMap::new(),
            usage_after: BTreeMap::new(),
            duration_nanos: duration_ms * 1_000_000,
        }
    }

    fn enabled_profiler(rt: &MockRuntime) -> EventDrivenProfiler<MockRuntime> {
        let mut profiler = EventDrivenProfiler::new(rt.clone(), ReportConfig::default());
        profiler.enable().unwrap();
        profiler
    }

    #[test]
    fn test_total_time_sums_durations() {
        let rt = MockRuntime::single_young_eden();
        let profiler = enabled_profiler(&rt);
        for (id, ms) in [(1, 10), (2, 25), (3, 5)] {
            rt.emit(notification(id, "Young", ms)).unwrap();
        }
        assert_eq!(profiler.total_time(), 0.04);
    }

    #[test]
    fn test_enable_subscribes_every_collector() {
        let rt = MockRuntime::typical_generational();
        let profiler = enabled_profiler(&rt);
        assert!(profiler.is_subscribed());
        assert_eq!(rt.subscriber_count("Young Generation"), 1);
        assert_eq!(rt.subscriber_count("Old Generation"), 1);
    }

    #[test]
    fn test_enable_twice_does_not_duplicate() {
        let rt = MockRuntime::typical_generational();
        let mut profiler = enabled_profiler(&rt);
        rt.record_collection("Young Generation", Duration::from_millis(3), &[])
            .unwrap();

        profiler.enable().unwrap();
        assert_eq!(rt.subscriber_count("Young Generation"), 1);
        assert_eq!(profiler.events().len(), 1);

        rt.record_collection("Young Generation", Duration::from_millis(3), &[])
            .unwrap();
        assert_eq!(profiler.events().len(), 2);
    }

    #[test]
    fn test_disable_keeps_events_and_stays_enabled() {
        let rt = MockRuntime::typical_generational();
        let mut profiler = enabled_profiler(&rt);
        rt.record_collection("Old Generation", Duration::from_millis(40), &[])
            .unwrap();

        profiler.disable();
        assert_eq!(rt.subscriber_count("Old Generation"), 0);
        assert!(!profiler.is_subscribed());
        assert!(profiler.is_enabled());

        rt.record_collection("Old Generation", Duration::from_millis(40), &[])
            .unwrap();
        assert_eq!(profiler.events().len(), 1);
        assert_eq!(profiler.total_time(), 0.04);
    }

    #[test]
    fn test_reenable_after_disable_resubscribes() {
        let rt = MockRuntime::typical_generational();
        let mut profiler = enabled_profiler(&rt);
        profiler.disable();
        profiler.enable().unwrap();
        assert_eq!(rt.subscriber_count("Young Generation"), 1);
    }

    #[test]
    fn test_clear_then_result_is_empty() {
        let rt = MockRuntime::typical_generational();
        let mut profiler = enabled_profiler(&rt);
        rt.record_collection("Young Generation", Duration::from_millis(3), &[])
            .unwrap();

        profiler.clear();
        assert_eq!(profiler.result().as_deref(), Some("GC: \n"));
        assert_eq!(profiler.total_time(), 0.0);
        assert!(profiler.is_subscribed());
    }

    #[test]
    fn test_never_enabled_profiler_reports_nothing() {
        let profiler =
            EventDrivenProfiler::new(MockRuntime::typical_generational(), ReportConfig::default());
        assert!(!profiler.is_enabled());
        assert_eq!(profiler.total_time(), 0.0);
        assert_eq!(profiler.result().as_deref(), Some("GC: \n"));
        assert!(profiler.events().is_empty());
    }

    #[test]
    fn test_result_is_non_destructive() {
        let rt = MockRuntime::typical_generational();
        let profiler = enabled_profiler(&rt);
        rt.record_collection("Young Generation", Duration::from_millis(3), &[])
            .unwrap();
        let first = profiler.result();
        let second = profiler.result();
        assert_eq!(first, second);
        assert_eq!(profiler.events().len(), 1);
    }

    #[test]
    fn test_result_summary_and_rows() {
        let rt = MockRuntime::typical_generational();
        let profiler = enabled_profiler(&rt);
        rt.record_collection("Young Generation", Duration::from_millis(3), &[])
            .unwrap();
        rt.record_collection("Young Generation", Duration::from_millis(4), &[])
            .unwrap();
        rt.record_collection("Old Generation", Duration::from_millis(50), &[])
            .unwrap();

        let result = profiler.result().unwrap();
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines[0], "GC: 2 Young Generation, 1 Old Generation");
        assert_eq!(lines[1], report::HEADER);
        assert_eq!(lines.len(), 5);
        assert_eq!(profiler.summary()[1], ("Old Generation".to_string(), 1));
    }

    #[test]
    fn test_memory_counts_only_pools_after_collection() {
        let mut n = notification(1, "Young", 1);
        n.usage_before
            .insert("Eden".into(), MemoryUsage::new(0, 0, 0, 8192));
        n.usage_before
            .insert("Released".into(), MemoryUsage::new(0, 0, 0, 100_000));
        n.usage_after
            .insert("Eden".into(), MemoryUsage::new(16384, 0, 0, 1024));
        n.usage_after
            .insert("Fresh".into(), MemoryUsage::new(2048, 0, 0, 2048));

        let mem = GcEvent::from_notification(n).memory();
        assert_eq!(
            mem,
            EventMemory {
                before: 8192,
                after: 3072,
                committed: 18432,
            }
        );
    }

    #[test]
    fn test_concurrent_delivery_loses_nothing() {
        let rt = MockRuntime::typical_generational();
        let profiler = enabled_profiler(&rt);

        std::thread::scope(|s| {
            for t in 0..4 {
                let rt = rt.clone();
                s.spawn(move || {
                    let collector = if t % 2 == 0 {
                        "Young Generation"
                    } else {
                        "Old Generation"
                    };
                    for _ in 0..250 {
                        rt.record_collection(collector, Duration::from_millis(1), &[])
                            .unwrap();
                    }
                });
            }
        });

        let events = profiler.events();
        assert_eq!(events.len(), 1000);
        assert_eq!(profiler.total_time(), 1.0);

        let mut young_ids: Vec<u64> = events
            .iter()
            .filter(|e| e.collector_name == "Young Generation")
            .map(|e| e.id)
            .collect();
        young_ids.sort_unstable();
        young_ids.dedup();
        assert_eq!(young_ids.len(), 500);
    }

    #[test]
    fn test_reads_during_delivery_see_consistent_copies() {
        let rt = MockRuntime::typical_generational();
        let profiler = enabled_profiler(&rt);
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..500 {
                    rt.record_collection("Young Generation", Duration::from_millis(1), &[])
                        .unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });
            s.spawn(|| {
                let mut last_total = 0.0;
                loop {
                    let finished = done.load(Ordering::SeqCst);

                    let total = profiler.total_time();
                    assert!(total >= last_total);
                    last_total = total;

                    let result = profiler.result().unwrap();
                    let mut lines = result.lines();
                    let summary = lines.next().unwrap();
                    let rows = lines.filter(|l| *l != report::HEADER).count();
                    if rows == 0 {
                        assert_eq!(summary, "GC: ");
                    } else {
                        assert_eq!(summary, format!("GC: {} Young Generation", rows));
                    }

                    if finished {
                        break;
                    }
                }
            });
        });

        assert_eq!(profiler.events().len(), 500);
        assert_eq!(profiler.total_time(), 0.5);
    }

    #[test]
    fn test_failed_subscription_rolls_back() {
        let rt = MockRuntime::without_notifications();
        let mut profiler = EventDrivenProfiler::new(rt.clone(), ReportConfig::default());
        let err = profiler.enable().unwrap_err();
        assert!(matches!(err, Error::Subscription { .. }));
        assert!(!profiler.is_subscribed());
        assert_eq!(rt.subscriber_count("Young Generation"), 0);
    }

    #[test]
    fn test_drop_releases_subscriptions() {
        let rt = MockRuntime::typical_generational();
        {
            let _profiler = enabled_profiler(&rt);
            assert_eq!(rt.subscriber_count("Old Generation"), 1);
        }
        assert_eq!(rt.subscriber_count("Old Generation"), 0);
    }
}
