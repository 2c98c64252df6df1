//! MPU-9250 9-axis IMU (with AK8963 magnetometer)
//!
//! - `config`: user configuration and validation
//! - `driver`: non-blocking state machine
//! - `interrupt`: data-ready handoff from the GPIO interrupt
//! - `registers`: register map

pub mod config;
pub mod driver;
pub mod interrupt;
pub mod registers;

pub use config::Mpu9250Config;
pub use driver::{Mpu9250Driver, Mpu9250State};
pub use interrupt::{DataReady, DataReadySignal};
