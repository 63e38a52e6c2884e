//! Mock runtime implementation for testing.
//!
//! Provides `MockRuntime`, an in-memory `TelemetryProvider`, and pre-built
//! scenarios for common heap layouts.

mod runtime;
mod scenarios;

pub use runtime::MockRuntime;
