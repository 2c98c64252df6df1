//! payload_core - Pure no_std sensor math for the payload avionics
//!
//! This crate contains platform-agnostic algorithms and types
//! that can be tested on host without any feature flags or embassy dependencies.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Trait abstractions**: Platform services injected via traits
//!
//! # Modules
//!
//! - [`traits`]: Platform-agnostic trait abstractions (TimeSource)
//! - [`imu`]: MPU-9250 sensitivity tables, sample accumulation, self-test math
//! - [`baro`]: MS5611 compensation and barometric altitude

#![no_std]

pub mod baro;
pub mod imu;
pub mod traits;
