//! MS5611 Configuration

use super::commands::{self, ADDRESS_CSB_HIGH, ADDRESS_CSB_LOW, CONVERSION_TIME_MS};
use crate::devices::ConfigError;

/// Shortest period that fits a pressure and a temperature conversion (ms)
pub const MIN_PERIOD_MS: u32 = 2 * CONVERSION_TIME_MS;

/// MS5611 driver configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ms5611Config {
    /// I2C address (0x77 with CSB low, 0x76 with CSB high)
    pub address: u8,
    /// Interval between the starts of consecutive readings (ms)
    pub period_ms: u32,
    /// Derive altitude from pressure
    pub calc_altitude: bool,
    /// Reference pressure for altitude (Pa); taken from the first reading when `None`
    pub p0: Option<i32>,
}

impl Default for Ms5611Config {
    fn default() -> Self {
        Self {
            address: commands::address_for_csb(false),
            period_ms: 100,
            calc_altitude: true,
            p0: None,
        }
    }
}

impl Ms5611Config {
    /// Configuration for a given CSB pin level
    pub fn with_csb(csb_high: bool) -> Self {
        Self {
            address: commands::address_for_csb(csb_high),
            ..Self::default()
        }
    }

    /// Reference pressure the driver starts with; non-positive presets are ignored
    pub fn preset_p0(&self) -> Option<i32> {
        self.p0.filter(|p0| *p0 > 0)
    }

    /// Check the configuration before a driver is created
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address != ADDRESS_CSB_LOW && self.address != ADDRESS_CSB_HIGH {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.period_ms < MIN_PERIOD_MS {
            return Err(ConfigError::InvalidPeriod(self.period_ms));
        }
        Ok(())
    }
}
