//! MS5611 command set
//!
//! The MS5611 has no register map: every transaction starts with a one-byte
//! command. Conversions always run at OSR 4096.

/// I2C address with CSB pulled low
pub const ADDRESS_CSB_LOW: u8 = 0x77;

/// I2C address with CSB pulled high
pub const ADDRESS_CSB_HIGH: u8 = 0x76;

/// Reload PROM into the internal registers
pub const CMD_RESET: u8 = 0x1E;

/// Start a pressure (D1) conversion, OSR 4096
pub const CMD_CONVERT_D1_OSR4096: u8 = 0x48;

/// Start a temperature (D2) conversion, OSR 4096
pub const CMD_CONVERT_D2_OSR4096: u8 = 0x58;

/// Read the 24-bit result of the last conversion
pub const CMD_ADC_READ: u8 = 0x00;

/// PROM read of coefficient C1; C2..C6 follow at 2-byte steps
pub const CMD_PROM_READ_C1: u8 = 0xA2;

/// Number of calibration coefficients
pub const PROM_COEFFICIENTS: usize = 6;

/// Reset reload time (ms), datasheet maximum 2.8
pub const RESET_TIME_MS: u32 = 3;

/// OSR 4096 conversion time (ms), datasheet maximum 9.04
pub const CONVERSION_TIME_MS: u32 = 10;

/// Address selected by the CSB pin level
pub const fn address_for_csb(csb_high: bool) -> u8 {
    if csb_high {
        ADDRESS_CSB_HIGH
    } else {
        ADDRESS_CSB_LOW
    }
}

/// PROM read command for coefficient `index` (0 = C1)
pub const fn prom_read(index: usize) -> u8 {
    CMD_PROM_READ_C1 + 2 * index as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prom_commands() {
        assert_eq!(prom_read(0), 0xA2);
        assert_eq!(prom_read(5), 0xAC);
    }

    #[test]
    fn test_csb_address() {
        assert_eq!(address_for_csb(false), 0x77);
        assert_eq!(address_for_csb(true), 0x76);
    }
}
