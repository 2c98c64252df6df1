//! Core traits for platform-agnostic sensor acquisition.
//!
//! This module provides trait abstractions that decouple the driver logic
//! from platform-specific implementations (Embassy, etc.).
//!
//! # Design
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - The Embassy-backed clock lives in `payload_avionics::platform`

pub mod time;

pub use time::{MockTime, TimeSource};
