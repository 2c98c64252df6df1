#![cfg_attr(not(any(test, feature = "mock")), no_std)]

//! payload_avionics - Sensor acquisition for a rocket payload board
//!
//! Non-blocking I2C drivers for an MPU-9250 IMU and an MS5611 barometric
//! altimeter, composed into a board `Variant` that feeds a deployment
//! service from the main loop.

// Platform abstraction layer: I2C transaction manager, clock, mocks
pub mod platform;

// Sensor drivers built on the platform traits
pub mod devices;

// Logging and board composition
pub mod core;

// Telemetry collaborator
pub mod communication;
