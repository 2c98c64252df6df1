//! MS5611 barometric pressure sensor
//!
//! 24-bit pressure and temperature ADC with factory calibration PROM,
//! driven over I2C as a non-blocking state machine.

pub mod commands;
pub mod config;
pub mod driver;

pub use config::Ms5611Config;
pub use driver::{Ms5611Driver, Ms5611State};
