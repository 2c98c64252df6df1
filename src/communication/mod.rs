//! Communication
//!
//! This module provides the telemetry collaborator interface the sensor
//! drivers publish through.
//!
//! # Services
//!
//! - **Telemetry**: buffer loan/return and sample publication
//!   - `NullTelemetry` for boards without a downlink
//!   - `SampleQueue` for a transport task to drain

pub mod telemetry;

pub use telemetry::{
    AltimeterSample, ImuSample, NullTelemetry, Sample, SampleQueue, SensorId, TelemetryService,
};

#[cfg(any(test, feature = "mock"))]
pub use telemetry::MockTelemetry;
