//! Barometer math

pub mod compensation;

pub use compensation::{altitude_m, compensate, Compensated};
