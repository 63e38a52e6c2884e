//! gcwatch-core — GC telemetry aggregation and profiling.
//!
//! Provides:
//! - `telemetry` — the runtime provider abstraction (and `MockRuntime` with
//!   the `mock` feature)
//! - `stats` — the statistics tree produced by snapshots
//! - `aggregator` — one-shot pull snapshot of all collectors and pools
//! - `capability` — runtime probe selecting a profiler strategy
//! - `profiler` — event-driven and polling GC profilers
//! - `fmt` — shared formatting helpers

pub mod aggregator;
pub mod capability;
pub mod error;
pub mod fmt;
pub mod profiler;
pub mod stats;
pub mod telemetry;

pub use aggregator::Aggregator;
pub use capability::{CapabilityDetector, ProfilerKind};
pub use error::{Error, Result};
pub use profiler::{GcProfiler, Profiler, ReportConfig};
pub use stats::StatisticsTree;
