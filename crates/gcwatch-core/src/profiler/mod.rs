//! GC profilers.
//!
//! Two strategies implement the same `Profiler` contract:
//!
//! - `EventDrivenProfiler` — subscribes to per-collection notifications and
//!   buffers one `GcEvent` per cycle; `result()` renders the buffer.
//! - `PollingProfiler` — reads cumulative collection time at `enable`/`clear`
//!   and differences it in `total_time()`; `result()` is `None`.
//!
//! `GcProfiler` wraps whichever strategy the `CapabilityDetector` selected,
//! so callers hold one owned handle regardless of the runtime.
//!
//! ```
//! use gcwatch_core::capability::CapabilityDetector;
//! use gcwatch_core::profiler::{GcProfiler, Profiler, ReportConfig};
//! use gcwatch_core::telemetry::MockRuntime;
//!
//! let rt = MockRuntime::without_notifications();
//! let detector = CapabilityDetector::new();
//! let mut profiler = GcProfiler::detect(&detector, rt, ReportConfig::default()).unwrap();
//! profiler.enable().unwrap();
//! assert_eq!(profiler.total_time(), 0.0);
//! assert!(profiler.result().is_none());
//! profiler.disable();
//! ```

pub mod event;
pub mod polling;
pub mod report;

use std::io::{self, Write};

use crate::capability::{CapabilityDetector, ProfilerKind};
use crate::error::Result;
use crate::telemetry::TelemetryProvider;

pub use event::{EventDrivenProfiler, EventLog, EventMemory, GcEvent};
pub use polling::PollingProfiler;
pub use report::ReportConfig;

/// Contract shared by both profiler strategies.
///
/// `total_time` and `result` never fail: a disabled profiler reports zero
/// and no events.
pub trait Profiler {
    fn kind(&self) -> ProfilerKind;

    /// Starts observing. Calling it again while enabled does not duplicate
    /// subscriptions or drop buffered events.
    fn enable(&mut self) -> Result<()>;

    fn disable(&mut self);

    fn clear(&mut self);

    fn is_enabled(&self) -> bool;

    /// Rendered event report, or `None` when per-event detail is
    /// unavailable.
    fn result(&self) -> Option<String>;

    /// Seconds spent collecting during the observation window.
    fn total_time(&self) -> f64;

    /// Writes `result()` to `out`; writes nothing when there is no detail.
    fn report(&self, out: &mut dyn Write) -> io::Result<()> {
        if let Some(result) = self.result() {
            writeln!(out, "{}", result)?;
        }
        Ok(())
    }
}

/// The profiler strategy selected for this process.
pub enum GcProfiler<P: TelemetryProvider> {
    EventDriven(EventDrivenProfiler<P>),
    Polling(PollingProfiler<P>),
}

impl<P: TelemetryProvider> GcProfiler<P> {
    pub fn new(kind: ProfilerKind, provider: P, config: ReportConfig) -> Self {
        match kind {
            ProfilerKind::EventDriven => {
                GcProfiler::EventDriven(EventDrivenProfiler::new(provider, config))
            }
            ProfilerKind::Polling => GcProfiler::Polling(PollingProfiler::new(provider)),
        }
    }

    /// Builds the strategy `detector` resolves for `provider`.
    pub fn detect(
        detector: &CapabilityDetector,
        provider: P,
        config: ReportConfig,
    ) -> Result<Self> {
        let kind = detector.detect(&provider)?;
        Ok(Self::new(kind, provider, config))
    }

    /// Structured events, when the strategy records them.
    pub fn events(&self) -> Option<Vec<GcEvent>> {
        match self {
            GcProfiler::EventDriven(p) => Some(p.events()),
            GcProfiler::Polling(_) => None,
        }
    }

    fn inner(&self) -> &dyn Profiler {
        match self {
            GcProfiler::EventDriven(p) => p,
            GcProfiler::Polling(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Profiler {
        match self {
            GcProfiler::EventDriven(p) => p,
            GcProfiler::Polling(p) => p,
        }
    }
}

impl<P: TelemetryProvider> Profiler for GcProfiler<P> {
    fn kind(&self) -> ProfilerKind {
        self.inner().kind()
    }

    fn enable(&mut self) -> Result<()> {
        self.inner_mut().enable()
    }

    fn disable(&mut self) {
        self.inner_mut().disable()
    }

    fn clear(&mut self) {
        self.inner_mut().clear()
    }

    fn is_enabled(&self) -> bool {
        self.inner().is_enabled()
    }

    fn result(&self) -> Option<String> {
        self.inner().result()
    }

    fn total_time(&self) -> f64 {
        self.inner().total_time()
    }
}
