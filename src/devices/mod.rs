//! Device drivers
//!
//! Drivers are written against the platform's `I2cBus` trait and a
//! `TimeSource`, so the same state machines run on target and on the host.
//!
//! ## Modules
//!
//! - `baro`: MS5611 barometric altimeter
//! - `imu`: MPU-9250 inertial measurement unit
//! - `transaction`: shared issue/poll/retry engine
//! - `traits`: device-independent read accessors

pub mod baro;
pub mod error;
pub mod imu;
pub mod traits;
pub mod transaction;

pub use error::ConfigError;
