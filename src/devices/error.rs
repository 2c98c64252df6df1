//! Driver configuration errors
//!
//! Returned by the driver constructors; a driver that fails validation is
//! never created, so no FSM runs for it.

use core::fmt;

/// Configuration rejected at driver initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// I2C address is not one the device can answer on
    InvalidAddress(u8),
    /// Interrupt line is not a GPIO on this board
    InvalidInterruptPin(u8),
    /// Requested sample rate cannot be produced with the chosen bandwidth
    InvalidSampleRate(u16),
    /// Sampling period must be long enough for a full conversion cycle (ms)
    InvalidPeriod(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAddress(addr) => write!(f, "invalid I2C address {:#04x}", addr),
            ConfigError::InvalidInterruptPin(pin) => write!(f, "invalid interrupt pin {}", pin),
            ConfigError::InvalidSampleRate(hz) => write!(f, "unsupported sample rate {} Hz", hz),
            ConfigError::InvalidPeriod(ms) => write!(f, "sampling period {} ms too short", ms),
        }
    }
}
