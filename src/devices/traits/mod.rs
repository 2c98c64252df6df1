//! Device traits
//!
//! This module contains hardware-independent trait definitions for device drivers.
//! These traits enable:
//! - Unit testing with mock implementations
//! - Sensor independence for the deployment logic

pub mod altimeter;
pub mod imu;

pub use altimeter::Altimeter;
pub use imu::InertialSensor;
