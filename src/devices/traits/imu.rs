//! Inertial sensor read accessors
//!
//! Device-independent view of the most recently committed IMU sample.
//! Every accessor is a pure read of driver state: it never touches the bus
//! and returns the last committed value whatever state the driver is in,
//! including after a failure.
//!
//! ## Usage
//!
//! ```ignore
//! use payload_avionics::devices::traits::InertialSensor;
//!
//! fn vertical_g<I: InertialSensor>(imu: &I) -> Option<f32> {
//!     (imu.last_sample_time() != 0).then(|| imu.accel_g().z)
//! }
//! ```

use nalgebra::Vector3;

/// Last-value accessors for a 9-axis IMU
pub trait InertialSensor {
    /// Accelerometer counts
    fn raw_accel(&self) -> [i16; 3];

    /// Gyroscope counts
    fn raw_gyro(&self) -> [i16; 3];

    /// Magnetometer counts (before sensitivity adjustment)
    fn raw_mag(&self) -> [i16; 3];

    /// Die temperature counts
    fn raw_temperature(&self) -> i16;

    /// Acceleration in g
    fn accel_g(&self) -> Vector3<f32>;

    /// Angular velocity in °/s
    fn gyro_dps(&self) -> Vector3<f32>;

    /// Magnetic flux in µT with sensitivity adjustment applied
    fn mag_ut(&self) -> Vector3<f32>;

    /// Die temperature in °C
    fn temperature_c(&self) -> f32;

    /// The last magnetometer reading overflowed; [`Self::raw_mag`] is stale
    fn mag_overflow(&self) -> bool;

    /// Data-ready time of the last committed sample (ms)
    fn last_sample_time(&self) -> u32;

    /// Driver stopped after an unrecoverable error
    fn is_failed(&self) -> bool;
}
