//! IMU Drivers
//!
//! ## Available Drivers
//!
//! - `mpu9250`: MPU-9250 9-axis IMU over I2C
//!
//! ## Usage
//!
//! ```ignore
//! use payload_avionics::devices::imu::{DataReadySignal, Mpu9250Config, Mpu9250Driver};
//!
//! static IMU_READY: DataReadySignal = DataReadySignal::new();
//!
//! // In the GPIO interrupt handler
//! IMU_READY.notify(now_ms);
//!
//! // In the main loop
//! let mut imu = Mpu9250Driver::new(Mpu9250Config::default(), &IMU_READY)?;
//! loop {
//!     imu.service(&mut bus, &time, &mut telemetry);
//! }
//! ```

pub mod mpu9250;

pub use mpu9250::{DataReadySignal, Mpu9250Config, Mpu9250Driver, Mpu9250State};
