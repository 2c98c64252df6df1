//! Sensitivity and unit conversion for the MPU-9250 / AK8963
//!
//! Pure lookups from the configured full-scale-range and bandwidth
//! enumerations to LSB-per-unit constants and sample rates. Nothing here
//! touches hardware or driver state.
//!
//! Sensitivities use integer encodings so they are exact:
//!
//! | Quantity      | Encoding          | Example                 |
//! |---------------|-------------------|-------------------------|
//! | Gyroscope     | 1000 × LSB/(°/s)  | ±250 °/s → 131072       |
//! | Accelerometer | LSB/g             | ±16 g → 2048            |
//! | Magnetometer  | 1000 × LSB/µT     | always 6666 (16-bit)    |

/// Full-scale magnitude of a signed 16-bit sample
const FULL_SCALE_COUNTS: u32 = 32_768;

/// Magnetometer sensitivity in 1000 × LSB/µT (0.15 µT/LSB in 16-bit output mode)
pub const MAG_SENSITIVITY: u16 = 6666;

/// Temperature sensor sensitivity (LSB/°C)
pub const TEMP_SENSITIVITY: f32 = 333.87;

/// Die temperature at a raw reading of 0 (°C)
pub const TEMP_OFFSET: f32 = 21.0;

/// Internal sample rate when the digital low pass filter is in use (Hz)
pub const DLPF_SAMPLE_RATE_HZ: u16 = 1000;

/// Gyroscope full scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum GyroFsr {
    /// ±250 °/s
    Dps250 = 0,
    /// ±500 °/s
    Dps500 = 1,
    /// ±1000 °/s
    Dps1000 = 2,
    /// ±2000 °/s
    #[default]
    Dps2000 = 3,
}

impl GyroFsr {
    /// FS_SEL field value (GYRO_CONFIG[4:3])
    pub const fn fs_sel(self) -> u8 {
        self as u8
    }

    /// Range in °/s
    pub const fn range_dps(self) -> u32 {
        250 << (self as u32)
    }
}

/// Accelerometer full scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AccelFsr {
    /// ±2 g
    G2 = 0,
    /// ±4 g
    G4 = 1,
    /// ±8 g
    G8 = 2,
    /// ±16 g
    #[default]
    G16 = 3,
}

impl AccelFsr {
    /// ACCEL_FS_SEL field value (ACCEL_CONFIG[4:3])
    pub const fn fs_sel(self) -> u8 {
        self as u8
    }

    /// Range in g
    pub const fn range_g(self) -> u32 {
        2 << (self as u32)
    }
}

/// Gyroscope (and temperature) low pass filter bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GyroBandwidth {
    /// DLPF bypassed, 8800 Hz
    Bw8800Hz,
    /// DLPF bypassed, 3600 Hz
    Bw3600Hz,
    /// 250 Hz
    Bw250Hz,
    /// 184 Hz
    Bw184Hz,
    /// 92 Hz
    Bw92Hz,
    /// 41 Hz
    #[default]
    Bw41Hz,
    /// 20 Hz
    Bw20Hz,
    /// 10 Hz
    Bw10Hz,
    /// 5 Hz
    Bw5Hz,
}

impl GyroBandwidth {
    /// DLPF_CFG field value (CONFIG[2:0])
    pub const fn dlpf_cfg(self) -> u8 {
        match self {
            GyroBandwidth::Bw8800Hz | GyroBandwidth::Bw3600Hz | GyroBandwidth::Bw250Hz => 0,
            GyroBandwidth::Bw184Hz => 1,
            GyroBandwidth::Bw92Hz => 2,
            GyroBandwidth::Bw41Hz => 3,
            GyroBandwidth::Bw20Hz => 4,
            GyroBandwidth::Bw10Hz => 5,
            GyroBandwidth::Bw5Hz => 6,
        }
    }

    /// FCHOICE_B field value (GYRO_CONFIG[1:0])
    pub const fn fchoice_b(self) -> u8 {
        match self {
            GyroBandwidth::Bw8800Hz => 0b01,
            GyroBandwidth::Bw3600Hz => 0b10,
            _ => 0b00,
        }
    }
}

/// Accelerometer low pass filter bandwidth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccelBandwidth {
    /// DLPF bypassed, 1046 Hz
    Bw1046Hz,
    /// 420 Hz
    Bw420Hz,
    /// 218 Hz
    Bw218Hz,
    /// 99 Hz
    Bw99Hz,
    /// 45 Hz
    #[default]
    Bw45Hz,
    /// 21 Hz
    Bw21Hz,
    /// 10 Hz
    Bw10Hz,
    /// 5 Hz
    Bw5Hz,
}

impl AccelBandwidth {
    /// ACCEL_CONFIG_2 register value (ACCEL_FCHOICE_B and A_DLPF_CFG)
    pub const fn config2_bits(self) -> u8 {
        match self {
            AccelBandwidth::Bw1046Hz => 0b1000,
            AccelBandwidth::Bw420Hz => 7,
            AccelBandwidth::Bw218Hz => 1,
            AccelBandwidth::Bw99Hz => 2,
            AccelBandwidth::Bw45Hz => 3,
            AccelBandwidth::Bw21Hz => 4,
            AccelBandwidth::Bw10Hz => 5,
            AccelBandwidth::Bw5Hz => 6,
        }
    }
}

/// AK8963 continuous measurement rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MagOdr {
    /// Continuous measurement mode 1
    Hz8,
    /// Continuous measurement mode 2
    #[default]
    Hz100,
}

impl MagOdr {
    /// Output rate in Hz
    pub const fn rate_hz(self) -> u16 {
        match self {
            MagOdr::Hz8 => 8,
            MagOdr::Hz100 => 100,
        }
    }
}

/// Gyroscope sensitivity in 1000 × LSB/(°/s)
pub const fn gyro_sensitivity(fsr: GyroFsr) -> u32 {
    FULL_SCALE_COUNTS * 1000 / fsr.range_dps()
}

/// Accelerometer sensitivity in LSB/g
pub const fn accel_sensitivity(fsr: AccelFsr) -> u16 {
    (FULL_SCALE_COUNTS / fsr.range_g()) as u16
}

/// Magnetometer sensitivity in 1000 × LSB/µT, independent of configuration
pub const fn mag_sensitivity() -> u16 {
    MAG_SENSITIVITY
}

/// Internal gyroscope sample rate for a bandwidth setting (Hz)
pub const fn gyro_internal_rate_hz(bw: GyroBandwidth) -> u16 {
    match bw {
        GyroBandwidth::Bw8800Hz | GyroBandwidth::Bw3600Hz => 32_000,
        GyroBandwidth::Bw250Hz => 8_000,
        _ => DLPF_SAMPLE_RATE_HZ,
    }
}

/// Internal accelerometer sample rate for a bandwidth setting (Hz)
pub const fn accel_internal_rate_hz(bw: AccelBandwidth) -> u16 {
    match bw {
        AccelBandwidth::Bw1046Hz => 4_000,
        _ => DLPF_SAMPLE_RATE_HZ,
    }
}

/// SMPLRT_DIV value that produces `rate_hz` from the 1 kHz DLPF clock
///
/// Returns `None` for rates the divider cannot express (0, above 1 kHz, or
/// below 4 Hz). Non-integer ratios truncate toward the faster rate.
pub const fn sample_rate_divider(rate_hz: u16) -> Option<u8> {
    if rate_hz < 4 || rate_hz > DLPF_SAMPLE_RATE_HZ {
        return None;
    }
    Some((DLPF_SAMPLE_RATE_HZ / rate_hz - 1) as u8)
}

/// Output data rate produced by a SMPLRT_DIV value (Hz)
pub const fn output_data_rate_hz(divider: u8) -> u16 {
    DLPF_SAMPLE_RATE_HZ / (1 + divider as u16)
}

/// Convert a raw gyroscope sample to °/s
pub fn gyro_dps(raw: i16, fsr: GyroFsr) -> f32 {
    raw as f32 * 1000.0 / gyro_sensitivity(fsr) as f32
}

/// Convert a raw accelerometer sample to g
pub fn accel_g(raw: i16, fsr: AccelFsr) -> f32 {
    raw as f32 / accel_sensitivity(fsr) as f32
}

/// Sensitivity adjustment factor from an AK8963 fuse ROM ASA byte
///
/// `Hadj = H * ((ASA - 128) * 0.5 / 128 + 1)`
pub fn mag_adjustment(asa: u8) -> f32 {
    (asa as f32 - 128.0) * 0.5 / 128.0 + 1.0
}

/// Convert a raw magnetometer sample to µT, applying the ASA adjustment
pub fn mag_ut(raw: i16, asa: u8) -> f32 {
    raw as f32 * mag_adjustment(asa) * 1000.0 / MAG_SENSITIVITY as f32
}

/// Convert a raw die temperature sample to °C
pub fn temperature_c(raw: i16) -> f32 {
    raw as f32 / TEMP_SENSITIVITY + TEMP_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gyro_sensitivity_table() {
        assert_eq!(gyro_sensitivity(GyroFsr::Dps250), 131_072);
        assert_eq!(gyro_sensitivity(GyroFsr::Dps500), 65_536);
        assert_eq!(gyro_sensitivity(GyroFsr::Dps1000), 32_768);
        assert_eq!(gyro_sensitivity(GyroFsr::Dps2000), 16_384);
    }

    #[test]
    fn test_accel_sensitivity_table() {
        assert_eq!(accel_sensitivity(AccelFsr::G2), 16_384);
        assert_eq!(accel_sensitivity(AccelFsr::G4), 8_192);
        assert_eq!(accel_sensitivity(AccelFsr::G8), 4_096);
        assert_eq!(accel_sensitivity(AccelFsr::G16), 2_048);
    }

    #[test]
    fn test_field_encodings() {
        assert_eq!(GyroFsr::Dps2000.fs_sel(), 3);
        assert_eq!(AccelFsr::G4.fs_sel(), 1);
        assert_eq!(GyroBandwidth::Bw41Hz.dlpf_cfg(), 3);
        assert_eq!(GyroBandwidth::Bw8800Hz.fchoice_b(), 0b01);
        assert_eq!(AccelBandwidth::Bw45Hz.config2_bits(), 3);
        assert_eq!(AccelBandwidth::Bw1046Hz.config2_bits(), 0b1000);
    }

    #[test]
    fn test_internal_rates() {
        assert_eq!(gyro_internal_rate_hz(GyroBandwidth::Bw3600Hz), 32_000);
        assert_eq!(gyro_internal_rate_hz(GyroBandwidth::Bw250Hz), 8_000);
        assert_eq!(gyro_internal_rate_hz(GyroBandwidth::Bw5Hz), 1_000);
        assert_eq!(accel_internal_rate_hz(AccelBandwidth::Bw1046Hz), 4_000);
        assert_eq!(accel_internal_rate_hz(AccelBandwidth::Bw99Hz), 1_000);
    }

    #[test]
    fn test_sample_rate_divider() {
        assert_eq!(sample_rate_divider(1000), Some(0));
        assert_eq!(sample_rate_divider(100), Some(9));
        assert_eq!(sample_rate_divider(4), Some(249));
        assert_eq!(sample_rate_divider(3), None);
        assert_eq!(sample_rate_divider(0), None);
        assert_eq!(sample_rate_divider(2000), None);
        assert_eq!(output_data_rate_hz(9), 100);
    }

    #[test]
    fn test_physical_conversions() {
        assert!((gyro_dps(16_384, GyroFsr::Dps2000) - 1000.0).abs() < 1e-3);
        assert!((accel_g(-2_048, AccelFsr::G16) + 1.0).abs() < 1e-6);
        assert!((temperature_c(0) - 21.0).abs() < 1e-6);
        assert!((mag_adjustment(128) - 1.0).abs() < 1e-6);
        // 6666 LSB at unity adjustment is 1000 µT
        assert!((mag_ut(6666, 128) - 1000.0).abs() < 1e-2);
    }
}
