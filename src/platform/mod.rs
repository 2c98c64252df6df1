//! Platform abstraction layer
//!
//! This module provides the collaborator interfaces the sensor drivers run
//! against: the queued I2C transaction manager and the millisecond clock.
//! All hardware-specific code must be isolated to this module.

pub mod blocking;
pub mod error;
pub mod traits;

#[cfg(feature = "embassy")]
pub mod time;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use blocking::BlockingI2cBus;
pub use error::{I2cError, PlatformError, Result};
pub use traits::{I2cBus, TransactionId, TransactionStatus};

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;

/// Number of GPIO pins an interrupt line may be bound to
pub const GPIO_PIN_COUNT: u8 = 30;
