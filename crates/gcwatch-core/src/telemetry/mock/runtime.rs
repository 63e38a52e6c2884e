//! In-memory mock runtime for exercising the aggregator and profilers
//! without a real managed runtime.
//!
//! `MockRuntime` keeps its state behind a shared lock, so clones observe
//! the same runtime. Tests hand one clone to a profiler and drive
//! collections through another, the same way a real runtime collects on its
//! own threads while the profiler watches.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::telemetry::traits::{
    CollectionListener, CollectorInfo, GcNotification, MemoryPoolInfo, MemoryUsage, ProbeError,
    SubscriptionId, TelemetryError, TelemetryProvider,
};

/// Gap inserted on the mock clock between two collections.
const CYCLE_GAP_NANOS: u64 = 1_000_000;

struct MockCollector {
    name: String,
    count: u64,
    time_ms: u64,
    pool_names: Vec<String>,
    next_sequence: u64,
    listeners: Vec<(SubscriptionId, Arc<dyn CollectionListener>)>,
}

struct MockState {
    collectors: Vec<MockCollector>,
    pools: Vec<MemoryPoolInfo>,
    probe: Result<(), ProbeError>,
    next_subscription: u64,
    clock_nanos: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            collectors: Vec::new(),
            pools: Vec::new(),
            probe: Ok(()),
            next_subscription: 1,
            clock_nanos: 0,
        }
    }
}

impl MockState {
    fn collector_mut(&mut self, name: &str) -> Result<&mut MockCollector, TelemetryError> {
        self.collectors
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| TelemetryError::UnknownCollector(name.to_string()))
    }

    fn pool_mut(&mut self, name: &str) -> Option<&mut MemoryPoolInfo> {
        self.pools.iter_mut().find(|p| p.name == name)
    }
}

/// Thread-safe in-memory runtime.
#[derive(Clone, Default)]
pub struct MockRuntime {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MockRuntime")
            .field("collectors", &state.collectors.len())
            .field("pools", &state.pools.len())
            .field("probe", &state.probe)
            .finish()
    }
}

impl MockRuntime {
    /// Creates an empty runtime whose notification probe succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a collector managing the given pools.
    ///
    /// Pools are referenced by name; they may be added before or after the
    /// collector, or never (the aggregator skips missing pools).
    pub fn add_collector(&self, name: &str, count: u64, time_ms: u64, pool_names: &[&str]) {
        self.state().collectors.push(MockCollector {
            name: name.to_string(),
            count,
            time_ms,
            pool_names: pool_names.iter().map(|p| p.to_string()).collect(),
            next_sequence: count + 1,
            listeners: Vec::new(),
        });
    }

    /// Adds a memory pool with explicit current, peak and last-collection usage.
    pub fn add_pool(
        &self,
        name: &str,
        current: MemoryUsage,
        peak: MemoryUsage,
        last_collection: MemoryUsage,
    ) {
        self.state().pools.push(MemoryPoolInfo {
            name: name.to_string(),
            current,
            peak,
            last_collection,
        });
    }

    /// Removes a pool, simulating a region released by the runtime.
    pub fn remove_pool(&self, name: &str) {
        self.state().pools.retain(|p| p.name != name);
    }

    /// Overwrites the cumulative collection time of a collector.
    pub fn set_collection_time(&self, collector: &str, time_ms: u64) -> Result<(), TelemetryError> {
        self.state().collector_mut(collector)?.time_ms = time_ms;
        Ok(())
    }

    /// Overwrites the current usage of a pool. Peak usage follows `used`.
    pub fn set_pool_usage(&self, pool: &str, usage: MemoryUsage) {
        if let Some(p) = self.state().pool_mut(pool) {
            p.current = usage;
            if usage.used > p.peak.used {
                p.peak = usage;
            }
        }
    }

    /// Sets the outcome of `probe_notifications`.
    pub fn set_probe(&self, probe: Result<(), ProbeError>) {
        self.state().probe = probe;
    }

    /// Number of listeners currently attached to a collector.
    pub fn subscriber_count(&self, collector: &str) -> usize {
        self.state()
            .collectors
            .iter()
            .find(|c| c.name == collector)
            .map_or(0, |c| c.listeners.len())
    }

    /// Runs one simulated collection on `collector`.
    ///
    /// Advances the collector's count and time, moves each pool listed in
    /// `after` to its new usage, and notifies every subscribed listener.
    /// The notification's before/after maps cover all pools the collector
    /// manages. Returns the sequence id assigned to the cycle.
    pub fn record_collection(
        &self,
        collector: &str,
        duration: Duration,
        after: &[(&str, MemoryUsage)],
    ) -> Result<u64, TelemetryError> {
        let (notification, listeners) = {
            let mut state = self.state();
            let pool_names = state.collector_mut(collector)?.pool_names.clone();

            let start_time_nanos = state.clock_nanos;
            let duration_nanos = duration.as_nanos() as u64;
            state.clock_nanos += duration_nanos + CYCLE_GAP_NANOS;

            let mut usage_before = BTreeMap::new();
            let mut usage_after = BTreeMap::new();
            for name in &pool_names {
                let Some(pool) = state.pool_mut(name) else {
                    continue;
                };
                usage_before.insert(name.clone(), pool.current);
                if let Some((_, usage)) = after.iter().find(|(n, _)| *n == name.as_str()) {
                    pool.current = *usage;
                    pool.last_collection = *usage;
                    if usage.used > pool.peak.used {
                        pool.peak = *usage;
                    }
                }
                usage_after.insert(name.clone(), pool.current);
            }

            let c = state.collector_mut(collector)?;
            c.count += 1;
            c.time_ms += duration.as_millis() as u64;
            let sequence_id = c.next_sequence;
            c.next_sequence += 1;

            let notification = GcNotification {
                sequence_id,
                collector_name: c.name.clone(),
                start_time_nanos,
                usage_before,
                usage_after,
                duration_nanos,
            };
            let listeners: Vec<_> = c.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (notification, listeners)
        };

        // Delivered outside the lock so listeners may call back into the runtime.
        let sequence_id = notification.sequence_id;
        for listener in listeners {
            listener.on_collection(notification.clone());
        }
        Ok(sequence_id)
    }

    /// Delivers a hand-built notification to the listeners of its collector
    /// without touching any counters.
    pub fn emit(&self, notification: GcNotification) -> Result<(), TelemetryError> {
        let listeners: Vec<_> = {
            let mut state = self.state();
            let c = state.collector_mut(&notification.collector_name)?;
            c.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener.on_collection(notification.clone());
        }
        Ok(())
    }
}

impl TelemetryProvider for MockRuntime {
    fn list_collectors(&self) -> Vec<CollectorInfo> {
        self.state()
            .collectors
            .iter()
            .map(|c| CollectorInfo {
                name: c.name.clone(),
                collection_count: c.count,
                collection_time_ms: c.time_ms,
                pool_names: c.pool_names.clone(),
            })
            .collect()
    }

    fn list_memory_pools(&self) -> Vec<MemoryPoolInfo> {
        self.state().pools.clone()
    }

    fn probe_notifications(&self) -> Result<(), ProbeError> {
        self.state().probe.clone()
    }

    fn subscribe(
        &self,
        collector: &str,
        listener: Arc<dyn CollectionListener>,
    ) -> Result<SubscriptionId, TelemetryError> {
        let mut state = self.state();
        if state.probe.is_err() {
            return Err(TelemetryError::NotificationsUnsupported);
        }
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.collector_mut(collector)?.listeners.push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, collector: &str, id: SubscriptionId) -> Result<(), TelemetryError> {
        let mut state = self.state();
        let c = state.collector_mut(collector)?;
        let before = c.listeners.len();
        c.listeners.retain(|(sid, _)| *sid != id);
        if c.listeners.len() == before {
            return Err(TelemetryError::UnknownSubscription(id));
        }
        Ok(())
    }
}
