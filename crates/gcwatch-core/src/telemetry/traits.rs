//! Abstractions over the managed runtime's GC telemetry.
//!
//! The `TelemetryProvider` trait allows the aggregator and profilers to work
//! with any runtime that can report collectors and memory pools, and with the
//! in-memory `MockRuntime` for testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A point-in-time reading of one memory pool.
///
/// All values are bytes. `init` and `max` may be `-1` when the runtime
/// reports them as undefined; they are carried through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub committed: i64,
    pub init: i64,
    pub max: i64,
    pub used: i64,
}

impl MemoryUsage {
    pub fn new(committed: i64, init: i64, max: i64, used: i64) -> Self {
        Self {
            committed,
            init,
            max,
            used,
        }
    }

    /// Usage with only the `used` field set.
    pub fn with_used(used: i64) -> Self {
        Self {
            used,
            ..Self::default()
        }
    }
}

/// Read-only view of one logical collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorInfo {
    pub name: String,
    /// Cumulative number of completed collections.
    pub collection_count: u64,
    /// Cumulative time spent collecting, in milliseconds.
    pub collection_time_ms: u64,
    /// Names of the pools this collector manages.
    pub pool_names: Vec<String>,
}

/// Read-only view of one memory pool at three temporal points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPoolInfo {
    pub name: String,
    pub current: MemoryUsage,
    /// Peak usage since runtime start (or since the runtime last reset it).
    pub peak: MemoryUsage,
    /// Usage right after the most recent collection of this pool.
    pub last_collection: MemoryUsage,
}

/// Notification delivered once per completed collection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcNotification {
    /// Strictly increasing within one collector.
    pub sequence_id: u64,
    pub collector_name: String,
    /// Cycle start, in nanoseconds since runtime start.
    pub start_time_nanos: u64,
    pub usage_before: BTreeMap<String, MemoryUsage>,
    pub usage_after: BTreeMap<String, MemoryUsage>,
    pub duration_nanos: u64,
}

/// Handle returned by `TelemetryProvider::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Receives collection notifications.
///
/// Runtimes may call `on_collection` from several collector threads at once.
pub trait CollectionListener: Send + Sync {
    fn on_collection(&self, notification: GcNotification);
}

/// Outcome of probing for collection-notification support.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The notification type is definitely absent from the runtime.
    #[error("collection notifications unsupported: {0}")]
    Unsupported(String),
    /// The probe itself failed; support is unknown.
    #[error("notification probe failed: {0}")]
    Failed(String),
}

/// Error reported by a provider for subscription calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("unknown collector: {0}")]
    UnknownCollector(String),
    #[error("collection notifications are not supported by this runtime")]
    NotificationsUnsupported,
    #[error("subscription {0:?} is not registered")]
    UnknownSubscription(SubscriptionId),
}

/// Abstraction for a runtime that reports GC telemetry.
pub trait TelemetryProvider: Send + Sync {
    /// Lists every collector with its current cumulative counters.
    fn list_collectors(&self) -> Vec<CollectorInfo>;

    /// Lists every memory pool with its current, peak, and last-collection usage.
    fn list_memory_pools(&self) -> Vec<MemoryPoolInfo>;

    /// Checks whether per-collection notifications are available.
    fn probe_notifications(&self) -> Result<(), ProbeError>;

    /// Attaches `listener` to one collector's notification stream.
    fn subscribe(
        &self,
        collector: &str,
        listener: Arc<dyn CollectionListener>,
    ) -> Result<SubscriptionId, TelemetryError>;

    /// Detaches a listener previously attached with `subscribe`.
    fn unsubscribe(&self, collector: &str, id: SubscriptionId) -> Result<(), TelemetryError>;
}

impl<P: TelemetryProvider + ?Sized> TelemetryProvider for Arc<P> {
    fn list_collectors(&self) -> Vec<CollectorInfo> {
        (**self).list_collectors()
    }

    fn list_memory_pools(&self) -> Vec<MemoryPoolInfo> {
        (**self).list_memory_pools()
    }

    fn probe_notifications(&self) -> Result<(), ProbeError> {
        (**self).probe_notifications()
    }

    fn subscribe(
        &self,
        collector: &str,
        listener: Arc<dyn CollectionListener>,
    ) -> Result<SubscriptionId, TelemetryError> {
        (**self).subscribe(collector, listener)
    }

    fn unsubscribe(&self, collector: &str, id: SubscriptionId) -> Result<(), TelemetryError> {
        (**self).unsubscribe(collector, id)
    }
}
