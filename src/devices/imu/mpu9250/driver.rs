//! MPU-9250 I2C driver
//!
//! Non-blocking state machine driven by [`Mpu9250Driver::service`]. Each call
//! performs at most one step: issue a transaction, observe a completion, or
//! pass a time gate. Consuming a data-ready edge in `Idle` and issuing the
//! sample read it calls for count as one step, so the read starts on the
//! same call that sees the edge. The MS5611 driver has no interrupt and
//! issues its conversion on the call after leaving `Idle`. The AK8963 is configured through bypass mode and then
//! read by the MPU-9250's internal I2C master into EXT_SENS_DATA, so one
//! 22-byte block read returns accel, temperature, gyro and magnetometer data.
//!
//! # State sequence
//!
//! ```text
//! Reset -> Wake -> CheckWhoAmI -> ConfigureSensors
//!   -> EnableBypass -> CheckMagId -> ResetMag -> MagFuseRom -> ReadMagSensitivity
//!   -> MagPowerDown -> MagContinuous -> ConfigureMagSlave -> ConfigureInterrupt
//!   -> EnableI2cMaster
//!   [-> SelfTestConfigure -> Accumulate -> SelfTestEnable -> Accumulate
//!    -> SelfTestDisable -> ReadGyroSelfTest -> ReadAccelSelfTest -> RestoreConfig]
//!   [-> Accumulate -> WriteGyroOffsets]
//!   -> Idle <-> ReadSample                                  (direct reads)
//!   -> FifoConfigure -> FifoStart -> SampleWait
//!        -> ReadFifoCount -> ReadFifoBurst -> SampleWait    (FIFO batching)
//! any transaction state -> Failed
//! ```
//!
//! # Data-ready handoff
//!
//! The interrupt handler only calls [`DataReadySignal::notify`]. Sampling
//! states consume the edges from the service loop. In direct-read mode the
//! application may instead call [`Mpu9250Driver::start_async_read`] right
//! after the interrupt to start the block read without waiting for the next
//! service call; the result is committed by the following `service` call.

use super::config::Mpu9250Config;
use super::interrupt::DataReadySignal;
use super::registers::{self as reg, AK8963_ADDR, MOTION_BLOCK_LEN, SAMPLE_LEN};
use crate::communication::{ImuSample, Sample, SensorId, TelemetryService};
use crate::devices::traits::InertialSensor;
use crate::devices::transaction::{Command, I2cTransactionSlot, SlotEvent};
use crate::devices::ConfigError;
use crate::platform::{
    error::{I2cError, PlatformError},
    traits::{I2cBus, TransactionId, TransactionStatus},
};
use crate::{log_debug, log_error, log_info, log_warn};
use heapless::Vec;
use nalgebra::Vector3;
use payload_core::imu::{self_test, units, AccumulateMode, SampleAccumulator, SelfTestResult};
use payload_core::traits::TimeSource;

/// Time for the device reset to complete (ms)
pub const RESET_TIME_MS: u32 = 100;

/// Clock source settle time after wake (ms)
pub const WAKE_TIME_MS: u32 = 10;

/// AK8963 mode transition time (ms)
pub const MAG_MODE_SWITCH_MS: u32 = 1;

/// Settle time after changing self-test configuration (ms)
pub const SELF_TEST_SETTLE_MS: u32 = 20;

/// Samples averaged for each half of the self-test
pub const SELF_TEST_SAMPLES: u8 = 200;

/// Samples averaged for gyro bias calibration
pub const GYRO_CAL_SAMPLES: u8 = 64;

/// Samples discarded before gyro bias calibration
pub const GYRO_CAL_EXTRA_SAMPLES: u8 = 8;

/// FIFO records collected before a burst read
pub const FIFO_BURST_RECORDS: usize = 16;

/// Largest single read: one full FIFO burst
pub const MAX_READ_LEN: usize = FIFO_BURST_RECORDS * SAMPLE_LEN;

/// Time for the internal I2C master to fetch the first AK8963 block (ms)
const MASTER_START_MS: u32 = 10;

/// 1 kHz, 92 Hz DLPF, ±250 °/s, ±2 g, as the factory trim was measured
const SELF_TEST_BLOCK: [u8; 6] = [reg::SMPLRT_DIV, 0, 2, 0, 0, 2];

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mpu9250State {
    Reset,
    Wake,
    CheckWhoAmI,
    ConfigureSensors,
    /// Route the auxiliary bus to the host for AK8963 setup
    EnableBypass,
    CheckMagId,
    ResetMag,
    MagFuseRom,
    ReadMagSensitivity,
    MagPowerDown,
    MagContinuous,
    /// Point slave 0 at AK8963 ST1..ST2
    ConfigureMagSlave,
    /// Leave bypass, enable the raw data-ready interrupt
    ConfigureInterrupt,
    EnableI2cMaster,
    SelfTestConfigure,
    SelfTestEnable,
    SelfTestDisable,
    ReadGyroSelfTest,
    ReadAccelSelfTest,
    RestoreConfig,
    /// Averaging sub-sequence; resumes at the stored continuation state
    Accumulate,
    WriteGyroOffsets,
    FifoConfigure,
    /// Reset and enable the FIFO
    FifoStart,
    /// Waiting for data-ready (direct reads)
    Idle,
    ReadSample,
    /// Waiting for enough FIFO records (FIFO batching)
    SampleWait,
    ReadFifoCount,
    ReadFifoBurst,
    /// Unrecoverable error; no further transactions
    Failed,
}

/// One decoded 22-byte sample block or FIFO record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RawRecord {
    accel: [i16; 3],
    temperature: i16,
    gyro: [i16; 3],
    mag: [i16; 3],
    st2: u8,
}

impl RawRecord {
    /// Accel/temp/gyro are big-endian; the AK8963 block is little-endian
    fn parse(raw: &[u8]) -> Self {
        let le = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            accel: be_triplet(&raw[0..6]),
            temperature: i16::from_be_bytes([raw[6], raw[7]]),
            gyro: be_triplet(&raw[8..14]),
            mag: [le(15), le(17), le(19)],
            st2: raw[21],
        }
    }

    fn mag_overflow(&self) -> bool {
        self.st2 & reg::AK8963_ST2_HOFL != 0
    }
}

fn be_triplet(raw: &[u8]) -> [i16; 3] {
    [
        i16::from_be_bytes([raw[0], raw[1]]),
        i16::from_be_bytes([raw[2], raw[3]]),
        i16::from_be_bytes([raw[4], raw[5]]),
    ]
}

fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// MPU-9250 + AK8963 driver
pub struct Mpu9250Driver<'a, S: TelemetryService> {
    config: Mpu9250Config,
    divider: u8,
    signal: &'a DataReadySignal,
    state: Mpu9250State,
    accumulate_next: Mpu9250State,
    slot: I2cTransactionSlot,
    buffer: [u8; MAX_READ_LEN],
    telem_buffer: Option<S::Buffer>,

    // Calibration
    mag_asa: [u8; 3],
    accel_acc: SampleAccumulator,
    gyro_acc: SampleAccumulator,
    accel_average: [i32; 3],
    gyro_average: [i32; 3],
    gyro_st_codes: [u8; 3],
    self_test: Option<SelfTestResult>,
    gyro_bias: [i16; 3],
    accel_bias: [i16; 3],

    // Sampling
    next_sample_time: u32,
    samples_left: u32,
    fifo_records: usize,
    burst_records: usize,
    async_t_id: Option<TransactionId>,
    async_sample_time: u32,

    // Last committed sample
    accel: [i16; 3],
    gyro: [i16; 3],
    mag: [i16; 3],
    temperature: i16,
    mag_overflow: bool,
    last_sample_time: u32,
}

impl<'a, S: TelemetryService> Mpu9250Driver<'a, S> {
    /// Validate `config` and prepare the reset sequence
    ///
    /// `signal` is the flag the data-ready interrupt handler notifies. No bus
    /// traffic happens until the first [`Self::service`] call.
    pub fn new(config: Mpu9250Config, signal: &'a DataReadySignal) -> Result<Self, ConfigError> {
        let divider = config.validate()?;

        Ok(Self {
            config,
            divider,
            signal,
            state: Mpu9250State::Reset,
            accumulate_next: Mpu9250State::Idle,
            slot: I2cTransactionSlot::new(),
            buffer: [0; MAX_READ_LEN],
            telem_buffer: None,
            mag_asa: [128; 3],
            accel_acc: SampleAccumulator::new(),
            gyro_acc: SampleAccumulator::new(),
            accel_average: [0; 3],
            gyro_average: [0; 3],
            gyro_st_codes: [0; 3],
            self_test: None,
            gyro_bias: [0; 3],
            accel_bias: [0; 3],
            next_sample_time: 0,
            samples_left: 0,
            fifo_records: 0,
            burst_records: 0,
            async_t_id: None,
            async_sample_time: 0,
            accel: [0; 3],
            gyro: [0; 3],
            mag: [0; 3],
            temperature: 0,
            mag_overflow: false,
            last_sample_time: 0,
        })
    }

    /// Restart from the reset sequence
    ///
    /// The last committed sample stays readable. A loaned telemetry buffer is
    /// handed back empty.
    pub fn reinit(&mut self, telemetry: &mut S) {
        log_info!("MPU9250: reinitializing");
        self.release_buffer(telemetry, 0);
        self.slot.reset();
        self.state = Mpu9250State::Reset;
        self.self_test = None;
    }

    /// Current state
    pub fn state(&self) -> Mpu9250State {
        self.state
    }

    /// Configuration the driver was created with
    pub fn config(&self) -> &Mpu9250Config {
        &self.config
    }

    /// SMPLRT_DIV value derived from the configured rate
    pub fn divider(&self) -> u8 {
        self.divider
    }

    /// AK8963 fuse ROM sensitivity adjustment bytes
    pub fn mag_asa(&self) -> [u8; 3] {
        self.mag_asa
    }

    /// Verdict of the built-in self-test, once it has run
    pub fn self_test_result(&self) -> Option<SelfTestResult> {
        self.self_test
    }

    /// Gyro bias measured at rest (counts at the configured range)
    pub fn gyro_bias(&self) -> [i16; 3] {
        self.gyro_bias
    }

    /// Accelerometer average measured during gyro calibration
    ///
    /// Not written to the device: the resting orientation is unknown.
    pub fn accel_bias(&self) -> [i16; 3] {
        self.accel_bias
    }

    /// A state-machine transaction is in flight
    pub fn i2c_in_progress(&self) -> bool {
        self.slot.i2c_in_progress()
    }

    /// An interrupt-window read is in flight
    pub fn async_i2c_in_progress(&self) -> bool {
        self.async_t_id.is_some()
    }

    /// Start the sample read directly from the interrupt window
    ///
    /// Only in direct-read mode, in `Idle`, with data-ready pending and
    /// nothing else in flight. Returns `true` if a read was started. A
    /// failed read is dropped without retry.
    pub fn start_async_read<B: I2cBus>(&mut self, bus: &mut B) -> bool {
        if self.state != Mpu9250State::Idle || self.async_t_id.is_some() || !self.slot.is_idle() {
            return false;
        }
        let Some(ready) = self.signal.take() else {
            return false;
        };

        match bus.begin_transaction(self.config.address, &[reg::ACCEL_XOUT_H], SAMPLE_LEN) {
            Ok(id) => {
                self.async_t_id = Some(id);
                self.async_sample_time = ready.time_ms;
                true
            }
            Err(PlatformError::I2c(I2cError::QueueFull)) => {
                // Leave the edge for the service loop
                self.signal.notify(ready.time_ms);
                false
            }
            Err(e) => {
                log_warn!("MPU9250: interrupt-window read rejected: {}", e);
                false
            }
        }
    }

    /// Advance the state machine by one step
    pub fn service<B: I2cBus, T: TimeSource>(&mut self, bus: &mut B, time: &T, telemetry: &mut S) {
        if self.async_t_id.is_some() {
            self.service_async(bus, telemetry);
            return;
        }

        match self.state {
            Mpu9250State::Failed => return,
            Mpu9250State::Idle => {
                let Some(ready) = self.signal.take() else {
                    return;
                };
                self.next_sample_time = ready.time_ms;
                self.state = Mpu9250State::ReadSample;
            }
            Mpu9250State::SampleWait => {
                if let Some(ready) = self.signal.take() {
                    self.next_sample_time = ready.time_ms;
                    self.samples_left = self.samples_left.saturating_sub(ready.edges);
                }
                if self.samples_left == 0 {
                    self.state = Mpu9250State::ReadFifoCount;
                }
                return;
            }
            _ => {}
        }

        let read_buf: &mut [u8] = match self.telem_buffer.as_mut() {
            Some(buffer) => buffer.as_mut(),
            None => &mut self.buffer[..],
        };
        match self.slot.service(bus, time, read_buf) {
            SlotEvent::Idle => self.issue(bus, time, telemetry),
            SlotEvent::Busy => {}
            SlotEvent::Complete => self.complete(telemetry),
            SlotEvent::Failed(e) => self.fail(e, telemetry),
        }
    }

    fn service_async<B: I2cBus>(&mut self, bus: &mut B, telemetry: &mut S) {
        let Some(id) = self.async_t_id else {
            return;
        };
        match bus.poll_transaction(id, &mut self.buffer[..SAMPLE_LEN]) {
            TransactionStatus::Pending => {}
            TransactionStatus::Success => {
                self.async_t_id = None;
                let record = RawRecord::parse(&self.buffer[..SAMPLE_LEN]);
                self.commit(record, self.async_sample_time, telemetry);
            }
            TransactionStatus::Failed(e) => {
                self.async_t_id = None;
                log_warn!("MPU9250: interrupt-window read failed ({}), sample dropped", e);
            }
        }
    }

    fn issue<B: I2cBus, T: TimeSource>(&mut self, bus: &mut B, time: &T, telemetry: &mut S) {
        if self.state == Mpu9250State::Accumulate && self.signal.take().is_none() {
            return;
        }
        let Some(command) = self.command() else {
            return;
        };

        if matches!(
            self.state,
            Mpu9250State::ReadSample | Mpu9250State::ReadFifoBurst
        ) {
            self.telem_buffer = telemetry.checkout_buffer(SensorId::Imu, command.read_len);
            if self
                .telem_buffer
                .as_ref()
                .is_some_and(|b| b.as_ref().len() < command.read_len)
            {
                self.release_buffer(telemetry, 0);
            }
        }

        if let SlotEvent::Failed(e) = self.slot.issue(bus, time, command) {
            self.fail(e, telemetry);
        }
    }

    /// Command for the current state, if it issues one
    fn command(&self) -> Option<Command> {
        let mpu = self.config.address;
        let command = match self.state {
            Mpu9250State::Reset => {
                Command::write(mpu, &[reg::PWR_MGMT_1, reg::PWR_MGMT_1_H_RESET])
                    .with_post_wait(RESET_TIME_MS)
            }
            Mpu9250State::Wake => {
                Command::write(mpu, &[reg::PWR_MGMT_1, reg::PWR_MGMT_1_CLKSEL_AUTO])
                    .with_post_wait(WAKE_TIME_MS)
            }
            Mpu9250State::CheckWhoAmI => Command::read(mpu, reg::WHO_AM_I, 1),
            Mpu9250State::ConfigureSensors | Mpu9250State::RestoreConfig => {
                Command::write(mpu, &self.config.sensor_block(self.divider))
            }
            Mpu9250State::EnableBypass => {
                Command::write(mpu, &[reg::INT_PIN_CFG, reg::INT_PIN_CFG_BYPASS_EN])
            }
            Mpu9250State::CheckMagId => Command::read(AK8963_ADDR, reg::AK8963_WIA, 1),
            Mpu9250State::ResetMag => {
                Command::write(AK8963_ADDR, &[reg::AK8963_CNTL2, reg::AK8963_CNTL2_SRST])
                    .with_post_wait(MAG_MODE_SWITCH_MS)
            }
            Mpu9250State::MagFuseRom => {
                Command::write(AK8963_ADDR, &[reg::AK8963_CNTL1, reg::AK8963_MODE_FUSE_ROM])
                    .with_post_wait(MAG_MODE_SWITCH_MS)
            }
            Mpu9250State::ReadMagSensitivity => Command::read(AK8963_ADDR, reg::AK8963_ASAX, 3),
            Mpu9250State::MagPowerDown => {
                Command::write(AK8963_ADDR, &[reg::AK8963_CNTL1, reg::AK8963_MODE_POWER_DOWN])
                    .with_post_wait(MAG_MODE_SWITCH_MS)
            }
            Mpu9250State::MagContinuous => {
                Command::write(AK8963_ADDR, &[reg::AK8963_CNTL1, self.config.mag_mode()])
                    .with_post_wait(MAG_MODE_SWITCH_MS)
            }
            Mpu9250State::ConfigureMagSlave => Command::write(
                mpu,
                &[
                    reg::I2C_MST_CTRL,
                    reg::I2C_MST_CLK_400KHZ,
                    reg::I2C_SLV_READ | AK8963_ADDR,
                    reg::AK8963_ST1,
                    reg::I2C_SLV_EN | reg::AK8963_BLOCK_LEN,
                ],
            ),
            Mpu9250State::ConfigureInterrupt => {
                Command::write(mpu, &[reg::INT_PIN_CFG, 0x00, reg::INT_ENABLE_RAW_RDY_EN])
            }
            Mpu9250State::EnableI2cMaster => {
                Command::write(mpu, &[reg::USER_CTRL, reg::USER_CTRL_I2C_MST_EN])
                    .with_post_wait(MASTER_START_MS)
            }
            Mpu9250State::SelfTestConfigure => {
                Command::write(mpu, &SELF_TEST_BLOCK).with_post_wait(SELF_TEST_SETTLE_MS)
            }
            Mpu9250State::SelfTestEnable => Command::write(
                mpu,
                &[
                    reg::GYRO_CONFIG,
                    reg::SELF_TEST_ENABLE_XYZ,
                    reg::SELF_TEST_ENABLE_XYZ,
                ],
            )
            .with_post_wait(SELF_TEST_SETTLE_MS),
            Mpu9250State::SelfTestDisable => {
                Command::write(mpu, &[reg::GYRO_CONFIG, 0x00, 0x00])
                    .with_post_wait(SELF_TEST_SETTLE_MS)
            }
            Mpu9250State::ReadGyroSelfTest => Command::read(mpu, reg::SELF_TEST_X_GYRO, 3),
            Mpu9250State::ReadAccelSelfTest => Command::read(mpu, reg::SELF_TEST_X_ACCEL, 3),
            Mpu9250State::Accumulate => Command::read(mpu, reg::ACCEL_XOUT_H, MOTION_BLOCK_LEN),
            Mpu9250State::WriteGyroOffsets => Command::write(mpu, &self.gyro_offset_block()),
            Mpu9250State::FifoConfigure => Command::write(
                mpu,
                &[
                    reg::FIFO_EN,
                    reg::FIFO_EN_TEMP | reg::FIFO_EN_GYRO_XYZ | reg::FIFO_EN_ACCEL | reg::FIFO_EN_SLV0,
                ],
            ),
            Mpu9250State::FifoStart => Command::write(
                mpu,
                &[
                    reg::USER_CTRL,
                    reg::USER_CTRL_FIFO_EN | reg::USER_CTRL_I2C_MST_EN | reg::USER_CTRL_FIFO_RST,
                ],
            ),
            Mpu9250State::ReadSample => Command::read(mpu, reg::ACCEL_XOUT_H, SAMPLE_LEN),
            Mpu9250State::ReadFifoCount => Command::read(mpu, reg::FIFO_COUNTH, 2),
            // A retried FIFO read would start mid-record; a failure resets the FIFO instead
            Mpu9250State::ReadFifoBurst => {
                Command::read(mpu, reg::FIFO_R_W, self.burst_records * SAMPLE_LEN).with_retries(0)
            }
            Mpu9250State::Idle | Mpu9250State::SampleWait | Mpu9250State::Failed => return None,
        };
        Some(command)
    }

    /// XG_OFFSET_H..ZG_OFFSET_L cancelling the measured bias
    ///
    /// The offset registers count in 1000 °/s units (4 × the ±250 °/s LSB).
    fn gyro_offset_block(&self) -> [u8; 7] {
        let shift = self.config.gyro_fsr.fs_sel();
        let mut block = [0u8; 7];
        block[0] = reg::XG_OFFSET_H;
        for axis in 0..3 {
            let offset = saturate_i16(-(self.gyro_average[axis] << shift) / 4);
            block[1 + 2 * axis..3 + 2 * axis].copy_from_slice(&offset.to_be_bytes());
        }
        block
    }

    fn complete(&mut self, telemetry: &mut S) {
        match self.state {
            Mpu9250State::Reset => self.state = Mpu9250State::Wake,
            Mpu9250State::Wake => self.state = Mpu9250State::CheckWhoAmI,
            Mpu9250State::CheckWhoAmI => {
                let who_am_i = self.buffer[0];
                match who_am_i {
                    reg::MPU9250_WHO_AM_I_VALUE | reg::MPU9255_WHO_AM_I_VALUE => {
                        log_info!("MPU9250: detected (WHO_AM_I {:#x})", who_am_i);
                        self.state = Mpu9250State::ConfigureSensors;
                    }
                    _ => {
                        log_error!(
                            "MPU9250: unexpected WHO_AM_I {:#x} (expected 0x71 or 0x73)",
                            who_am_i
                        );
                        self.state = Mpu9250State::Failed;
                    }
                }
            }
            Mpu9250State::ConfigureSensors => self.state = Mpu9250State::EnableBypass,
            Mpu9250State::EnableBypass => self.state = Mpu9250State::CheckMagId,
            Mpu9250State::CheckMagId => {
                let wia = self.buffer[0];
                if wia == reg::AK8963_WHO_AM_I_VALUE {
                    self.state = Mpu9250State::ResetMag;
                } else {
                    log_error!("MPU9250: unexpected AK8963 WIA {:#x}", wia);
                    self.state = Mpu9250State::Failed;
                }
            }
            Mpu9250State::ResetMag => self.state = Mpu9250State::MagFuseRom,
            Mpu9250State::MagFuseRom => self.state = Mpu9250State::ReadMagSensitivity,
            Mpu9250State::ReadMagSensitivity => {
                self.mag_asa = [self.buffer[0], self.buffer[1], self.buffer[2]];
                log_info!("MPU9250: AK8963 ASA {:?}", self.mag_asa);
                self.state = Mpu9250State::MagPowerDown;
            }
            Mpu9250State::MagPowerDown => self.state = Mpu9250State::MagContinuous,
            Mpu9250State::MagContinuous => self.state = Mpu9250State::ConfigureMagSlave,
            Mpu9250State::ConfigureMagSlave => self.state = Mpu9250State::ConfigureInterrupt,
            Mpu9250State::ConfigureInterrupt => self.state = Mpu9250State::EnableI2cMaster,
            Mpu9250State::EnableI2cMaster => {
                if self.config.run_self_test {
                    self.state = Mpu9250State::SelfTestConfigure;
                } else {
                    self.start_gyro_calibration();
                }
            }
            Mpu9250State::SelfTestConfigure => self.begin_accumulate(
                SELF_TEST_SAMPLES,
                0,
                AccumulateMode::Add,
                Mpu9250State::SelfTestEnable,
            ),
            Mpu9250State::SelfTestEnable => self.begin_accumulate(
                SELF_TEST_SAMPLES,
                0,
                AccumulateMode::SubtractBaseline,
                Mpu9250State::SelfTestDisable,
            ),
            Mpu9250State::SelfTestDisable => self.state = Mpu9250State::ReadGyroSelfTest,
            Mpu9250State::ReadGyroSelfTest => {
                self.gyro_st_codes = [self.buffer[0], self.buffer[1], self.buffer[2]];
                self.state = Mpu9250State::ReadAccelSelfTest;
            }
            Mpu9250State::ReadAccelSelfTest => {
                let accel_codes = [self.buffer[0], self.buffer[1], self.buffer[2]];
                let result = self_test::evaluate(
                    self.gyro_average,
                    self.gyro_st_codes,
                    self.accel_average,
                    accel_codes,
                );
                if result.passed() {
                    log_info!("MPU9250: self-test passed");
                } else {
                    log_warn!(
                        "MPU9250: self-test failed (gyro {:?}, accel {:?})",
                        result.gyro_pass,
                        result.accel_pass
                    );
                }
                self.self_test = Some(result);
                self.state = Mpu9250State::RestoreConfig;
            }
            Mpu9250State::RestoreConfig => self.start_gyro_calibration(),
            Mpu9250State::Accumulate => self.accumulate_sample(),
            Mpu9250State::WriteGyroOffsets => {
                self.gyro_bias = self.gyro_average.map(saturate_i16);
                self.accel_bias = self.accel_average.map(saturate_i16);
                log_info!(
                    "MPU9250: gyro bias {:?}, accel {:?}",
                    self.gyro_bias,
                    self.accel_bias
                );
                self.start_sampling();
            }
            Mpu9250State::FifoConfigure => self.state = Mpu9250State::FifoStart,
            Mpu9250State::FifoStart => {
                self.signal.clear();
                self.samples_left = FIFO_BURST_RECORDS as u32;
                self.state = Mpu9250State::SampleWait;
            }
            Mpu9250State::ReadSample => {
                let telem = self.telem_buffer.take();
                let record = {
                    let data: &[u8] = match telem.as_ref() {
                        Some(buffer) => buffer.as_ref(),
                        None => &self.buffer[..],
                    };
                    RawRecord::parse(&data[..SAMPLE_LEN])
                };
                if let Some(buffer) = telem {
                    telemetry.return_buffer(SensorId::Imu, buffer, SAMPLE_LEN);
                }
                self.commit(record, self.next_sample_time, telemetry);
                self.state = Mpu9250State::Idle;
            }
            Mpu9250State::ReadFifoCount => self.handle_fifo_count(),
            Mpu9250State::ReadFifoBurst => self.commit_fifo_burst(telemetry),
            Mpu9250State::Idle | Mpu9250State::SampleWait | Mpu9250State::Failed => {}
        }
    }

    fn start_gyro_calibration(&mut self) {
        if self.config.calibrate_gyro {
            self.begin_accumulate(
                GYRO_CAL_SAMPLES,
                GYRO_CAL_EXTRA_SAMPLES,
                AccumulateMode::Add,
                Mpu9250State::WriteGyroOffsets,
            );
        } else {
            self.start_sampling();
        }
    }

    fn start_sampling(&mut self) {
        log_info!(
            "MPU9250: sampling at {} Hz (fifo: {})",
            units::output_data_rate_hz(self.divider),
            self.config.use_fifo
        );
        if self.config.use_fifo {
            self.state = Mpu9250State::FifoConfigure;
        } else {
            self.signal.clear();
            self.state = Mpu9250State::Idle;
        }
    }

    fn begin_accumulate(
        &mut self,
        samples: u8,
        extra: u8,
        mode: AccumulateMode,
        next: Mpu9250State,
    ) {
        self.accel_acc.begin(samples, extra, mode);
        self.gyro_acc.begin(samples, extra, mode);
        self.accumulate_next = next;
        self.signal.clear();
        self.state = Mpu9250State::Accumulate;
    }

    fn accumulate_sample(&mut self) {
        let accel = be_triplet(&self.buffer[0..6]);
        let gyro = be_triplet(&self.buffer[8..14]);
        let accel_done = self.accel_acc.push(accel);
        let gyro_done = self.gyro_acc.push(gyro);

        if accel_done && gyro_done {
            self.accel_average = self.accel_acc.finalize();
            self.gyro_average = self.gyro_acc.finalize();
            log_debug!(
                "MPU9250: averages accel {:?} gyro {:?}",
                self.accel_average,
                self.gyro_average
            );
            self.state = self.accumulate_next;
        }
    }

    fn handle_fifo_count(&mut self) {
        let count = (u16::from_be_bytes([self.buffer[0], self.buffer[1]]) & 0x1FFF) as usize;

        // A full FIFO overwrites the oldest bytes and loses record alignment
        if count % SAMPLE_LEN != 0 || count >= reg::FIFO_SIZE {
            log_warn!("MPU9250: FIFO misaligned ({} bytes), resetting", count);
            self.state = Mpu9250State::FifoStart;
            return;
        }

        self.fifo_records = count / SAMPLE_LEN;
        if self.fifo_records == 0 {
            self.samples_left = 1;
            self.state = Mpu9250State::SampleWait;
            return;
        }
        self.burst_records = self.fifo_records.min(FIFO_BURST_RECORDS);
        self.state = Mpu9250State::ReadFifoBurst;
    }

    fn commit_fifo_burst(&mut self, telemetry: &mut S) {
        let len = self.burst_records * SAMPLE_LEN;
        let telem = self.telem_buffer.take();
        let records: Vec<RawRecord, FIFO_BURST_RECORDS> = {
            let data: &[u8] = match telem.as_ref() {
                Some(buffer) => buffer.as_ref(),
                None => &self.buffer[..],
            };
            data[..len]
                .chunks_exact(SAMPLE_LEN)
                .map(RawRecord::parse)
                .collect()
        };
        if let Some(buffer) = telem {
            telemetry.return_buffer(SensorId::Imu, buffer, len);
        }

        // The newest record in the FIFO belongs to the latest data-ready edge
        let period = Mpu9250Config::sample_period_ms(self.divider);
        for (i, record) in records.iter().enumerate() {
            let age = (self.fifo_records - 1 - i) as u32 * period;
            self.commit(*record, self.next_sample_time.wrapping_sub(age), telemetry);
        }

        let backlog = self.fifo_records - self.burst_records;
        self.samples_left = FIFO_BURST_RECORDS.saturating_sub(backlog) as u32;
        self.state = Mpu9250State::SampleWait;
    }

    fn commit(&mut self, record: RawRecord, time_ms: u32, telemetry: &mut S) {
        self.accel = record.accel;
        self.gyro = record.gyro;
        self.temperature = record.temperature;
        self.mag_overflow = record.mag_overflow();
        if !self.mag_overflow {
            self.mag = record.mag;
        }
        self.last_sample_time = time_ms;

        telemetry.publish_sample(&Sample::Imu(ImuSample {
            time_ms,
            accel: self.accel,
            gyro: self.gyro,
            mag: self.mag,
            temperature: self.temperature,
            mag_overflow: self.mag_overflow,
        }));
    }

    fn release_buffer(&mut self, telemetry: &mut S, filled: usize) {
        if let Some(buffer) = self.telem_buffer.take() {
            telemetry.return_buffer(SensorId::Imu, buffer, filled);
        }
    }

    fn fail(&mut self, error: I2cError, telemetry: &mut S) {
        self.release_buffer(telemetry, 0);
        if self.state == Mpu9250State::ReadFifoBurst {
            log_warn!("MPU9250: FIFO burst failed ({}), resetting FIFO", error);
            self.state = Mpu9250State::FifoStart;
            return;
        }
        log_error!("MPU9250: {:?} failed: {}", self.state, error);
        self.state = Mpu9250State::Failed;
    }
}

impl<S: TelemetryService> InertialSensor for Mpu9250Driver<'_, S> {
    fn raw_accel(&self) -> [i16; 3] {
        self.accel
    }

    fn raw_gyro(&self) -> [i16; 3] {
        self.gyro
    }

    fn raw_mag(&self) -> [i16; 3] {
        self.mag
    }

    fn raw_temperature(&self) -> i16 {
        self.temperature
    }

    fn accel_g(&self) -> Vector3<f32> {
        let fsr = self.config.accel_fsr;
        Vector3::from(self.accel.map(|raw| units::accel_g(raw, fsr)))
    }

    fn gyro_dps(&self) -> Vector3<f32> {
        let fsr = self.config.gyro_fsr;
        Vector3::from(self.gyro.map(|raw| units::gyro_dps(raw, fsr)))
    }

    fn mag_ut(&self) -> Vector3<f32> {
        Vector3::new(
            units::mag_ut(self.mag[0], self.mag_asa[0]),
            units::mag_ut(self.mag[1], self.mag_asa[1]),
            units::mag_ut(self.mag[2], self.mag_asa[2]),
        )
    }

    fn temperature_c(&self) -> f32 {
        units::temperature_c(self.temperature)
    }

    fn mag_overflow(&self) -> bool {
        self.mag_overflow
    }

    fn last_sample_time(&self) -> u32 {
        self.last_sample_time
    }

    fn is_failed(&self) -> bool {
        self.state == Mpu9250State::Failed
    }
}
