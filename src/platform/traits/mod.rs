//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod i2c;

// Re-export trait interfaces
pub use i2c::{I2cBus, TransactionId, TransactionStatus};
