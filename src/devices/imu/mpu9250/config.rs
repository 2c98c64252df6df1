//! MPU-9250 Configuration
//!
//! Range and bandwidth enumerations live in `payload_core::imu::units` so the
//! conversion layer stays host-testable; this module groups them with the
//! board-level settings and validates the combination.

use super::registers::{self, MPU9250_ADDR, MPU9250_ADDR_ALT};
use crate::devices::ConfigError;
use crate::platform::GPIO_PIN_COUNT;
use payload_core::imu::units::{
    self, gyro_internal_rate_hz, sample_rate_divider, DLPF_SAMPLE_RATE_HZ,
};
use payload_core::imu::{AccelBandwidth, AccelFsr, GyroBandwidth, GyroFsr, MagOdr};

/// Complete MPU-9250 configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpu9250Config {
    /// I2C address (0x68 with AD0 low, 0x69 with AD0 high)
    pub address: u8,
    /// GPIO carrying the data-ready interrupt
    pub int_pin: u8,
    pub gyro_fsr: GyroFsr,
    pub gyro_bandwidth: GyroBandwidth,
    pub accel_fsr: AccelFsr,
    pub accel_bandwidth: AccelBandwidth,
    /// Output data rate (Hz), produced by dividing the 1 kHz DLPF clock
    pub sample_rate_hz: u16,
    pub mag_odr: MagOdr,
    /// Batch samples in the sensor FIFO and read them in bursts
    pub use_fifo: bool,
    /// Run the built-in self-test during initialization
    pub run_self_test: bool,
    /// Measure gyro bias at rest and write it to the offset registers
    pub calibrate_gyro: bool,
}

impl Default for Mpu9250Config {
    fn default() -> Self {
        Self {
            address: MPU9250_ADDR,
            int_pin: 4,
            gyro_fsr: GyroFsr::Dps2000,
            gyro_bandwidth: GyroBandwidth::Bw41Hz,
            accel_fsr: AccelFsr::G16,
            accel_bandwidth: AccelBandwidth::Bw45Hz,
            sample_rate_hz: 100,
            mag_odr: MagOdr::Hz100,
            use_fifo: true,
            run_self_test: true,
            calibrate_gyro: true,
        }
    }
}

impl Mpu9250Config {
    /// Check the configuration and compute the SMPLRT_DIV value
    pub fn validate(&self) -> Result<u8, ConfigError> {
        if self.address != MPU9250_ADDR && self.address != MPU9250_ADDR_ALT {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if self.int_pin >= GPIO_PIN_COUNT {
            return Err(ConfigError::InvalidInterruptPin(self.int_pin));
        }
        // The divider only applies on the 1 kHz DLPF path
        if gyro_internal_rate_hz(self.gyro_bandwidth) != DLPF_SAMPLE_RATE_HZ {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate_hz));
        }
        sample_rate_divider(self.sample_rate_hz)
            .ok_or(ConfigError::InvalidSampleRate(self.sample_rate_hz))
    }

    /// Register block written at SMPLRT_DIV: divider, CONFIG, GYRO_CONFIG,
    /// ACCEL_CONFIG, ACCEL_CONFIG_2
    pub fn sensor_block(&self, divider: u8) -> [u8; 6] {
        [
            registers::SMPLRT_DIV,
            divider,
            self.gyro_bandwidth.dlpf_cfg(),
            (self.gyro_fsr.fs_sel() << 3) | self.gyro_bandwidth.fchoice_b(),
            self.accel_fsr.fs_sel() << 3,
            self.accel_bandwidth.config2_bits(),
        ]
    }

    /// AK8963 CNTL1 value for continuous 16-bit measurement
    pub fn mag_mode(&self) -> u8 {
        let mode = match self.mag_odr {
            MagOdr::Hz8 => registers::AK8963_MODE_CONT_MEASURE_1,
            MagOdr::Hz100 => registers::AK8963_MODE_CONT_MEASURE_2,
        };
        mode | registers::AK8963_BIT_16BIT
    }

    /// Interval between samples (ms) for a validated divider
    pub fn sample_period_ms(divider: u8) -> u32 {
        1000 / units::output_data_rate_hz(divider) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Mpu9250Config::default();
        assert_eq!(config.address, 0x68);
        assert_eq!(config.gyro_fsr, GyroFsr::Dps2000);
        assert_eq!(config.accel_fsr, AccelFsr::G16);
        assert_eq!(config.sample_rate_hz, 100);
        assert!(config.use_fifo);
        assert_eq!(config.validate(), Ok(9));
    }

    #[test]
    fn test_sensor_block_encoding() {
        let config = Mpu9250Config::default();
        assert_eq!(config.sensor_block(9), [0x19, 9, 3, 0x18, 0x18, 3]);

        let config = Mpu9250Config {
            gyro_fsr: GyroFsr::Dps500,
            accel_fsr: AccelFsr::G4,
            accel_bandwidth: AccelBandwidth::Bw1046Hz,
            ..Default::default()
        };
        assert_eq!(config.sensor_block(0), [0x19, 0, 3, 0x08, 0x08, 0x08]);
    }

    #[test]
    fn test_mag_mode() {
        assert_eq!(Mpu9250Config::default().mag_mode(), 0x16);
        let config = Mpu9250Config {
            mag_odr: MagOdr::Hz8,
            ..Default::default()
        };
        assert_eq!(config.mag_mode(), 0x12);
    }

    #[test]
    fn test_rejects_invalid_address() {
        let config = Mpu9250Config {
            address: 0x0C,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidAddress(0x0C)));
    }

    #[test]
    fn test_rejects_invalid_interrupt_pin() {
        let config = Mpu9250Config {
            int_pin: GPIO_PIN_COUNT,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidInterruptPin(GPIO_PIN_COUNT))
        );
    }

    #[test]
    fn test_rejects_unreachable_sample_rate() {
        let config = Mpu9250Config {
            sample_rate_hz: 2000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSampleRate(2000)));

        let config = Mpu9250Config {
            gyro_bandwidth: GyroBandwidth::Bw250Hz,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSampleRate(100)));
    }

    #[test]
    fn test_sample_period() {
        assert_eq!(Mpu9250Config::sample_period_ms(9), 10);
        assert_eq!(Mpu9250Config::sample_period_ms(0), 1);
    }
}
