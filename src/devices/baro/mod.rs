//! Barometer Drivers
//!
//! ## Available Drivers
//!
//! - `ms5611`: MS5611 barometric altimeter

pub mod ms5611;

pub use ms5611::{Ms5611Config, Ms5611Driver};
