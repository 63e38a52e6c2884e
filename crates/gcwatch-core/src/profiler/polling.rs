//! Polling profiler: differences cumulative collection time.
//!
//! Used when the runtime cannot notify per collection. Only the total time
//! spent collecting since the last `clear` is known.

use tracing::{debug, info};

use super::Profiler;
use crate::capability::ProfilerKind;
use crate::error::Result;
use crate::telemetry::TelemetryProvider;

pub struct PollingProfiler<P: TelemetryProvider> {
    provider: P,
    /// Collectors acquired at `enable`; `None` while disabled.
    collectors: Option<Vec<String>>,
    /// Cumulative milliseconds at the last `clear`.
    baseline_ms: u64,
}

impl<P: TelemetryProvider> PollingProfiler<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            collectors: None,
            baseline_ms: 0,
        }
    }

    /// Cumulative collection time of the acquired collectors.
    fn cumulative_ms(&self, names: &[String]) -> u64 {
        self.provider
            .list_collectors()
            .iter()
            .filter(|c| names.contains(&c.name))
            .map(|c| c.collection_time_ms)
            .sum()
    }

    pub fn baseline_ms(&self) -> u64 {
        self.baseline_ms
    }
}

impl<P: TelemetryProvider> Profiler for PollingProfiler<P> {
    fn kind(&self) -> ProfilerKind {
        ProfilerKind::Polling
    }

    fn enable(&mut self) -> Result<()> {
        if self.collectors.is_none() {
            let names: Vec<String> = self
                .provider
                .list_collectors()
                .into_iter()
                .map(|c| c.name)
                .collect();
            info!("GC profiler enabled (polling, {} collectors)", names.len());
            self.collectors = Some(names);
        }
        self.clear();
        Ok(())
    }

    fn disable(&mut self) {
        self.collectors = None;
        info!("GC profiler disabled");
    }

    /// Rebaselines at the current cumulative time. No-op while disabled.
    fn clear(&mut self) {
        if let Some(names) = &self.collectors {
            self.baseline_ms = self.cumulative_ms(names);
            debug!("GC baseline: {}ms", self.baseline_ms);
        }
    }

    fn is_enabled(&self) -> bool {
        self.collectors.is_some()
    }

    /// No per-event detail exists without notifications.
    fn result(&self) -> Option<String> {
        None
    }

    /// Seconds of collection since the last `clear`; 0 while disabled.
    fn total_time(&self) -> f64 {
        let Some(names) = &self.collectors else {
            return 0.0;
        };
        let elapsed = self.cumulative_ms(names).saturating_sub(self.baseline_ms);
        elapsed as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MockRuntime;
    use std::time::Duration;

    fn runtime_at(time_ms: u64) -> MockRuntime {
        let rt = MockRuntime::new();
        rt.add_collector("Copy", 0, time_ms, &[]);
        rt
    }

    #[test]
    fn test_total_time_is_difference_from_baseline() {
        let rt = runtime_at(1000);
        let mut profiler = PollingProfiler::new(rt.clone());
        profiler.enable().unwrap();
        assert_eq!(profiler.baseline_ms(), 1000);

        rt.set_collection_time("Copy", 1450).unwrap();
        assert_eq!(profiler.total_time(), 0.45);
    }

    #[test]
    fn test_total_time_sums_all_collectors() {
        let rt = MockRuntime::without_notifications();
        let mut profiler = PollingProfiler::new(rt.clone());
        profiler.enable().unwrap();

        rt.record_collection("Young Generation", Duration::from_millis(20), &[])
            .unwrap();
        rt.record_collection("Old Generation", Duration::from_millis(230), &[])
            .unwrap();
        assert_eq!(profiler.total_time(), 0.25);
    }

    #[test]
    fn test_total_time_non_decreasing() {
        let rt = runtime_at(0);
        let mut profiler = PollingProfiler::new(rt.clone());
        profiler.enable().unwrap();

        let mut last = profiler.total_time();
        for step in 1..=5 {
            rt.set_collection_time("Copy", step * 17).unwrap();
            let now = profiler.total_time();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 0.085);
    }

    #[test]
    fn test_clear_rebaselines() {
        let rt = runtime_at(100);
        let mut profiler = PollingProfiler::new(rt.clone());
        profiler.enable().unwrap();
        rt.set_collection_time("Copy", 300).unwrap();
        assert_eq!(profiler.total_time(), 0.2);

        profiler.clear();
        assert_eq!(profiler.total_time(), 0.0);
        rt.set_collection_time("Copy", 350).unwrap();
        assert_eq!(profiler.total_time(), 0.05);
    }

    #[test]
    fn test_enable_again_rebaselines() {
        let rt = runtime_at(100);
        let mut profiler = PollingProfiler::new(rt.clone());
        profiler.enable().unwrap();
        rt.set_collection_time("Copy", 300).unwrap();
        profiler.enable().unwrap();
        assert_eq!(profiler.total_time(), 0.0);
    }

    #[test]
    fn test_disable_drops_collectors() {
        let rt = runtime_at(100);
        let mut profiler = PollingProfiler::new(rt.clone());
        assert!(!profiler.is_enabled());
        profiler.enable().unwrap();
        assert!(profiler.is_enabled());

        profiler.disable();
        assert!(!profiler.is_enabled());
        rt.set_collection_time("Copy", 900).unwrap();
        assert_eq!(profiler.total_time(), 0.0);
    }

    #[test]
    fn test_result_has_no_detail() {
        let mut profiler = PollingProfiler::new(runtime_at(0));
        profiler.enable().unwrap();
        assert_eq!(profiler.result(), None);

        let mut out = Vec::new();
        profiler.report(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
