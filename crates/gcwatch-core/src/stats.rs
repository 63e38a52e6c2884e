//! Aggregated GC statistics.
//!
//! A `StatisticsTree` is produced by the `Aggregator` in one pass over the
//! runtime and is never modified afterwards.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::telemetry::MemoryPoolInfo;

/// The twelve usage fields of one pool: current, peak and last-collection
/// readings of committed/init/max/used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub committed: i64,
    pub init: i64,
    pub max: i64,
    pub used: i64,
    pub peak_committed: i64,
    pub peak_init: i64,
    pub peak_max: i64,
    pub peak_used: i64,
    pub last_committed: i64,
    pub last_init: i64,
    pub last_max: i64,
    pub last_used: i64,
}

impl PoolStats {
    pub fn from_pool(pool: &MemoryPoolInfo) -> Self {
        let (cur, peak, last) = (&pool.current, &pool.peak, &pool.last_collection);
        Self {
            committed: cur.committed,
            init: cur.init,
            max: cur.max,
            used: cur.used,
            peak_committed: peak.committed,
            peak_init: peak.init,
            peak_max: peak.max,
            peak_used: peak.used,
            last_committed: last.committed,
            last_init: last.init,
            last_max: last.max,
            last_used: last.used,
        }
    }
}

impl AddAssign<&PoolStats> for PoolStats {
    fn add_assign(&mut self, rhs: &PoolStats) {
        self.committed += rhs.committed;
        self.init += rhs.init;
        self.max += rhs.max;
        self.used += rhs.used;
        self.peak_committed += rhs.peak_committed;
        self.peak_init += rhs.peak_init;
        self.peak_max += rhs.peak_max;
        self.peak_used += rhs.peak_used;
        self.last_committed += rhs.last_committed;
        self.last_init += rhs.last_init;
        self.last_max += rhs.last_max;
        self.last_used += rhs.last_used;
    }
}

/// Per-collector entry of a statistics tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    /// Cumulative collection count.
    pub count: u64,
    /// Cumulative collection time in milliseconds.
    pub time: u64,
    pub pools: BTreeMap<String, PoolStats>,
}

/// Grand totals across every pool of every collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcTotals {
    pub count: u64,
    pub time: u64,
    #[serde(flatten)]
    pub usage: PoolStats,
}

/// Count/time growth of one collector between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub count: u64,
    pub time: u64,
}

/// Point-in-time statistics for all collectors and their pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsTree {
    /// Unix timestamp (seconds) at which the snapshot was taken.
    pub collected_at: i64,
    pub collectors: BTreeMap<String, CollectorStats>,
    pub totals: GcTotals,
}

impl StatisticsTree {
    pub fn collector(&self, name: &str) -> Option<&CollectorStats> {
        self.collectors.get(name)
    }

    pub fn pool(&self, collector: &str, pool: &str) -> Option<&PoolStats> {
        self.collectors.get(collector)?.pools.get(pool)
    }

    /// Counter growth per collector since `earlier`.
    ///
    /// Collectors absent from `earlier` count from zero. Counters that went
    /// backwards (runtime restart) saturate at zero.
    pub fn delta(&self, earlier: &StatisticsTree) -> BTreeMap<String, CounterDelta> {
        self.collectors
            .iter()
            .map(|(name, now)| {
                let (count, time) = earlier
                    .collectors
                    .get(name)
                    .map_or((0, 0), |prev| (prev.count, prev.time));
                let delta = CounterDelta {
                    count: now.count.saturating_sub(count),
                    time: now.time.saturating_sub(time),
                };
                (name.clone(), delta)
            })
            .collect()
    }
}
