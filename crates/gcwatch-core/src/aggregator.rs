//! Pull-based snapshot of all collectors and pools.
//!
//! The `Aggregator` walks the provider's collectors once, copies each
//! managed pool's usage into the collector's entry and adds it into the
//! grand totals.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::stats::{CollectorStats, GcTotals, PoolStats, StatisticsTree};
use crate::telemetry::{MemoryPoolInfo, TelemetryProvider};

/// Produces `StatisticsTree` snapshots from a telemetry provider.
pub struct Aggregator<P: TelemetryProvider> {
    provider: P,
}

impl<P: TelemetryProvider> Aggregator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Takes a snapshot with totals starting from zero.
    pub fn snapshot(&self) -> StatisticsTree {
        self.snapshot_seeded(GcTotals::default())
    }

    /// Takes a snapshot whose totals start from `seed`.
    ///
    /// Passing the totals of a previous snapshot accumulates across calls.
    /// Per-collector entries always hold the current readings only.
    ///
    /// A pool listed by a collector but missing from the pool list (released
    /// between the two reads) is skipped. A pool managed by several
    /// collectors is recorded under each and summed once per occurrence.
    /// A collector whose name was already seen in this pass is skipped, so
    /// the totals always match the entries in the tree.
    pub fn snapshot_seeded(&self, seed: GcTotals) -> StatisticsTree {
        let start = Instant::now();

        let pools: HashMap<String, MemoryPoolInfo> = self
            .provider
            .list_memory_pools()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        let mut totals = seed;
        let mut tree = StatisticsTree {
            collected_at: Utc::now().timestamp(),
            ..Default::default()
        };

        for collector in self.provider.list_collectors() {
            if tree.collectors.contains_key(&collector.name) {
                warn!("Duplicate collector name '{}', keeping the first", collector.name);
                continue;
            }
            let mut stats = CollectorStats {
                count: collector.collection_count,
                time: collector.collection_time_ms,
                ..Default::default()
            };
            totals.count += stats.count;
            totals.time += stats.time;

            for pool_name in &collector.pool_names {
                let Some(pool) = pools.get(pool_name) else {
                    warn!(
                        "Pool '{}' of collector '{}' disappeared, skipping",
                        pool_name, collector.name
                    );
                    continue;
                };
                let pool_stats = PoolStats::from_pool(pool);
                totals.usage += &pool_stats;
                stats.pools.insert(pool_name.clone(), pool_stats);
            }

            tree.collectors.insert(collector.name, stats);
        }

        tree.totals = totals;
        debug!(
            "GC snapshot: {} collectors, {} pools in {:?}",
            tree.collectors.len(),
            pools.len(),
            start.elapsed()
        );
        tree
    }
}
