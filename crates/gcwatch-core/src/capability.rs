//! Detection of the runtime's collection-notification support.
//!
//! The probe result decides which profiler strategy runs. "Unsupported"
//! selects polling; any other probe failure is returned to the caller so a
//! broken runtime never silently degrades to the weaker strategy.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::telemetry::{ProbeError, TelemetryProvider};

/// Profiler strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfilerKind {
    /// Per-collection notifications are buffered and reported individually.
    EventDriven,
    /// Cumulative collection time is differenced; no per-event detail.
    Polling,
}

impl std::fmt::Display for ProfilerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfilerKind::EventDriven => write!(f, "event-driven"),
            ProfilerKind::Polling => write!(f, "polling"),
        }
    }
}

/// Maps one probe outcome to a strategy.
pub fn probe_kind<P: TelemetryProvider + ?Sized>(provider: &P) -> Result<ProfilerKind> {
    match provider.probe_notifications() {
        Ok(()) => Ok(ProfilerKind::EventDriven),
        Err(ProbeError::Unsupported(detail)) => {
            debug!("Collection notifications unsupported: {}", detail);
            Ok(ProfilerKind::Polling)
        }
        Err(ProbeError::Failed(detail)) => Err(Error::Probe(detail)),
    }
}

/// Resolves the profiler strategy once and caches it.
///
/// Construct one detector at startup and keep it for the process lifetime.
/// Failed probes are not cached; a later call probes again.
#[derive(Debug, Default)]
pub struct CapabilityDetector {
    resolved: OnceLock<ProfilerKind>,
}

impl CapabilityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached strategy, probing `provider` on first use.
    pub fn detect<P: TelemetryProvider + ?Sized>(&self, provider: &P) -> Result<ProfilerKind> {
        if let Some(kind) = self.resolved.get() {
            return Ok(*kind);
        }
        let kind = probe_kind(provider)?;
        let kind = *self.resolved.get_or_init(|| kind);
        info!("GC profiler strategy: {}", kind);
        Ok(kind)
    }

    /// The strategy resolved so far, if any.
    pub fn resolved(&self) -> Option<ProfilerKind> {
        self.resolved.get().copied()
    }
}
