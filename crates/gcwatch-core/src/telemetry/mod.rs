//! Runtime GC telemetry: the provider abstraction and its mock.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Aggregator / CapabilityDetector / Profilers      │
//! └────────────────────────────┬────────────────────────────────┘
//!                              │
//!                   ┌──────────▼──────────┐
//!                   │  TelemetryProvider  │ (trait)
//!                   └──────────┬──────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              │                               │
//!       ┌──────▼──────┐                 ┌──────▼──────┐
//!       │  Runtime    │                 │ MockRuntime │
//!       │ (embedder)  │                 │ (Testing)   │
//!       └─────────────┘                 └─────────────┘
//! ```
//!
//! The embedding runtime implements `TelemetryProvider`; this crate only
//! reads from it and subscribes to it.
//!
//! ```
//! use gcwatch_core::telemetry::{MockRuntime, TelemetryProvider};
//!
//! let rt = MockRuntime::typical_generational();
//! assert_eq!(rt.list_collectors().len(), 2);
//! ```

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockRuntime;
pub use traits::{
    CollectionListener, CollectorInfo, GcNotification, MemoryPoolInfo, MemoryUsage, ProbeError,
    SubscriptionId, TelemetryError, TelemetryProvider,
};
