//! MPU-9250 and AK8963 Register Definitions
//!
//! Based on MPU-9250 Register Map (RM-MPU-9250A-00 v1.6)
//! and AK8963 Datasheet.

// ============================================================================
// I2C Addresses
// ============================================================================

/// MPU-9250 I2C address when AD0 pin is low
pub const MPU9250_ADDR: u8 = 0x68;

/// MPU-9250 I2C address when AD0 pin is high
pub const MPU9250_ADDR_ALT: u8 = 0x69;

/// AK8963 magnetometer I2C address (accessed via bypass mode)
pub const AK8963_ADDR: u8 = 0x0C;

// ============================================================================
// MPU-9250 Registers
// ============================================================================

/// Gyroscope factory self-test codes (X, Y, Z)
pub const SELF_TEST_X_GYRO: u8 = 0x00;

/// Accelerometer factory self-test codes (X, Y, Z)
pub const SELF_TEST_X_ACCEL: u8 = 0x0D;

/// Gyroscope offset registers, XG_OFFSET_H..ZG_OFFSET_L
pub const XG_OFFSET_H: u8 = 0x13;

/// Sample rate divider: SAMPLE_RATE = Internal_Sample_Rate / (1 + SMPLRT_DIV)
pub const SMPLRT_DIV: u8 = 0x19;

/// Gyroscope configuration (full-scale range, self-test)
pub const GYRO_CONFIG: u8 = 0x1B;

/// FIFO enable register
pub const FIFO_EN: u8 = 0x23;

/// I2C master control
pub const I2C_MST_CTRL: u8 = 0x24;

/// Interrupt pin configuration
pub const INT_PIN_CFG: u8 = 0x37;

/// Interrupt enable
pub const INT_ENABLE: u8 = 0x38;

/// First byte of the accel / temp / gyro / external sensor block (high byte first)
pub const ACCEL_XOUT_H: u8 = 0x3B;

/// User control register
pub const USER_CTRL: u8 = 0x6A;

/// Power management 1
pub const PWR_MGMT_1: u8 = 0x6B;

/// FIFO count, high byte first
pub const FIFO_COUNTH: u8 = 0x72;

/// FIFO read/write
pub const FIFO_R_W: u8 = 0x74;

/// Device ID
pub const WHO_AM_I: u8 = 0x75;

// ============================================================================
// MPU-9250 Register Values
// ============================================================================

/// MPU-9250 WHO_AM_I expected value
pub const MPU9250_WHO_AM_I_VALUE: u8 = 0x71;

/// MPU-9255 WHO_AM_I value (9-axis, improved MPU-9250)
pub const MPU9255_WHO_AM_I_VALUE: u8 = 0x73;

/// PWR_MGMT_1 bits
pub const PWR_MGMT_1_H_RESET: u8 = 0x80;
pub const PWR_MGMT_1_CLKSEL_AUTO: u8 = 0x01;

/// INT_PIN_CFG bits
pub const INT_PIN_CFG_BYPASS_EN: u8 = 0x02;

/// INT_ENABLE bits
pub const INT_ENABLE_RAW_RDY_EN: u8 = 0x01;

/// USER_CTRL bits
pub const USER_CTRL_FIFO_EN: u8 = 0x40;
pub const USER_CTRL_I2C_MST_EN: u8 = 0x20;
pub const USER_CTRL_FIFO_RST: u8 = 0x04;

/// I2C_MST_CTRL: 400 kHz master clock
pub const I2C_MST_CLK_400KHZ: u8 = 0x0D;

/// I2C_SLVx_ADDR read flag
pub const I2C_SLV_READ: u8 = 0x80;

/// I2C_SLVx_CTRL enable flag (low nibble holds the length)
pub const I2C_SLV_EN: u8 = 0x80;

/// FIFO_EN sources: temperature, gyro XYZ, accel, slave 0
pub const FIFO_EN_TEMP: u8 = 0x80;
pub const FIFO_EN_GYRO_XYZ: u8 = 0x70;
pub const FIFO_EN_ACCEL: u8 = 0x08;
pub const FIFO_EN_SLV0: u8 = 0x01;

/// GYRO_CONFIG / ACCEL_CONFIG self-test enable on all three axes
pub const SELF_TEST_ENABLE_XYZ: u8 = 0xE0;

/// FIFO capacity (bytes)
pub const FIFO_SIZE: usize = 512;

// ============================================================================
// AK8963 Magnetometer Registers
// ============================================================================

/// AK8963 device ID register
pub const AK8963_WIA: u8 = 0x00;

/// AK8963 status register 1 (data ready)
pub const AK8963_ST1: u8 = 0x02;

/// AK8963 control register 1 (mode, output bit)
pub const AK8963_CNTL1: u8 = 0x0A;

/// AK8963 control register 2 (soft reset)
pub const AK8963_CNTL2: u8 = 0x0B;

/// AK8963 sensitivity adjustment values (read in Fuse ROM access mode)
pub const AK8963_ASAX: u8 = 0x10;

// ============================================================================
// AK8963 Register Values
// ============================================================================

/// AK8963 WHO_AM_I expected value
pub const AK8963_WHO_AM_I_VALUE: u8 = 0x48;

/// AK8963 ST2 bits
pub const AK8963_ST2_HOFL: u8 = 0x08; // Magnetic sensor overflow

/// AK8963 CNTL1 mode settings
pub const AK8963_MODE_POWER_DOWN: u8 = 0x00;
pub const AK8963_MODE_CONT_MEASURE_1: u8 = 0x02; // 8Hz
pub const AK8963_MODE_CONT_MEASURE_2: u8 = 0x06; // 100Hz
pub const AK8963_MODE_FUSE_ROM: u8 = 0x0F;

/// AK8963 CNTL1 16-bit output
pub const AK8963_BIT_16BIT: u8 = 0x10;

/// AK8963 CNTL2 bits
pub const AK8963_CNTL2_SRST: u8 = 0x01; // Soft reset

/// ST1 through ST2, copied by slave 0 into EXT_SENS_DATA_00..07
pub const AK8963_BLOCK_LEN: u8 = 8;

// ============================================================================
// Sample Layout
// ============================================================================

/// Accel (6) + temp (2) + gyro (6) bytes starting at ACCEL_XOUT_H
pub const MOTION_BLOCK_LEN: usize = 14;

/// Motion block plus the magnetometer block; also one FIFO record
pub const SAMPLE_LEN: usize = MOTION_BLOCK_LEN + AK8963_BLOCK_LEN as usize;
