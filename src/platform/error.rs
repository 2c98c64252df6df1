//! Platform error types
//!
//! This module defines error types for platform operations.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformError {
    /// I2C operation failed
    I2c(I2cError),
    /// Invalid configuration provided
    InvalidConfig,
}

/// I2C-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Bus error occurred
    BusError,
    /// No acknowledgment received
    Nack,
    /// Arbitration lost
    ArbitrationLost,
    /// Timeout occurred
    Timeout,
    /// Invalid address
    InvalidAddress,
    /// Transaction manager has no free slot; retry on a later call
    QueueFull,
}

impl From<I2cError> for PlatformError {
    fn from(e: I2cError) -> Self {
        PlatformError::I2c(e)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::I2c(e) => write!(f, "I2C error: {}", e),
            PlatformError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

impl fmt::Display for I2cError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I2cError::BusError => write!(f, "bus error"),
            I2cError::Nack => write!(f, "no acknowledgment"),
            I2cError::ArbitrationLost => write!(f, "arbitration lost"),
            I2cError::Timeout => write!(f, "timeout"),
            I2cError::InvalidAddress => write!(f, "invalid address"),
            I2cError::QueueFull => write!(f, "transaction queue full"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_cause() {
        let err = PlatformError::from(I2cError::Nack);
        assert_eq!(format!("{}", err), "I2C error: no acknowledgment");
        assert_eq!(
            format!("{}", PlatformError::InvalidConfig),
            "Invalid configuration"
        );
    }
}
