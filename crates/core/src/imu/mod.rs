//! IMU math shared by the MPU-9250 driver
//!
//! - `units`: full-scale-range and bandwidth lookups, unit conversion
//! - `accumulator`: per-axis averaging used during calibration
//! - `self_test`: factory-trim comparison for the built-in self-test

pub mod accumulator;
pub mod units;

pub use accumulator::{AccumulateMode, SampleAccumulator};
pub use self_test::SelfTestResult;
pub use units::{AccelBandwidth, AccelFsr, GyroBandwidth, GyroFsr, MagOdr};
