//! Pre-built mock runtimes for testing.
//!
//! These scenarios provide realistic collector and pool layouts for the
//! configurations the profilers have to handle.

use super::runtime::MockRuntime;
use crate::telemetry::traits::{MemoryUsage, ProbeError};

const MIB: i64 = 1024 * 1024;

impl MockRuntime {
    /// A generational heap with a young and an old collector.
    ///
    /// The young collector manages eden and survivor, the old collector
    /// manages all three pools, so eden and survivor are reported twice.
    /// Old gen init/max are undefined (`-1`).
    pub fn typical_generational() -> Self {
        let rt = Self::new();

        rt.add_collector("Young Generation", 42, 380, &["Eden Space", "Survivor Space"]);
        rt.add_collector(
            "Old Generation",
            3,
            910,
            &["Eden Space", "Survivor Space", "Old Gen"],
        );

        rt.add_pool(
            "Eden Space",
            MemoryUsage::new(64 * MIB, 16 * MIB, 256 * MIB, 24 * MIB),
            MemoryUsage::new(64 * MIB, 16 * MIB, 256 * MIB, 60 * MIB),
            MemoryUsage::new(64 * MIB, 16 * MIB, 256 * MIB, 0),
        );
        rt.add_pool(
            "Survivor Space",
            MemoryUsage::new(8 * MIB, 2 * MIB, 32 * MIB, 3 * MIB),
            MemoryUsage::new(8 * MIB, 2 * MIB, 32 * MIB, 7 * MIB),
            MemoryUsage::new(8 * MIB, 2 * MIB, 32 * MIB, 3 * MIB),
        );
        rt.add_pool(
            "Old Gen",
            MemoryUsage::new(128 * MIB, -1, -1, 90 * MIB),
            MemoryUsage::new(128 * MIB, -1, -1, 110 * MIB),
            MemoryUsage::new(128 * MIB, -1, -1, 70 * MIB),
        );

        rt
    }

    /// The generational heap on a runtime without collection notifications.
    pub fn without_notifications() -> Self {
        let rt = Self::typical_generational();
        rt.set_probe(Err(ProbeError::Unsupported(
            "GcNotificationInfo not found".to_string(),
        )));
        rt
    }

    /// The generational heap on a runtime whose probe fails outright.
    pub fn broken_probe() -> Self {
        let rt = Self::typical_generational();
        rt.set_probe(Err(ProbeError::Failed(
            "management server unavailable".to_string(),
        )));
        rt
    }

    /// One collector "Young" (count 5, time 120ms) managing one pool "Eden"
    /// with current/peak/last used of 1000/2000/500 bytes.
    pub fn single_young_eden() -> Self {
        let rt = Self::new();
        rt.add_collector("Young", 5, 120, &["Eden"]);
        rt.add_pool(
            "Eden",
            MemoryUsage::with_used(1000),
            MemoryUsage::with_used(2000),
            MemoryUsage::with_used(500),
        );
        rt
    }
}
