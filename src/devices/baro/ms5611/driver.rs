//! MS5611 barometric pressure sensor driver
//!
//! Non-blocking state machine: each [`Ms5611Driver::service`] call performs
//! at most one step (issue a command, observe a completion, or pass a time
//! gate). After reset and PROM readout the driver alternates pressure and
//! temperature conversions once per configured period.
//!
//! # State sequence
//!
//! ```text
//! Reset -> ResetWait -> ReadCoefficient(0..6) -> Idle
//! Idle -> ConvertPressure -> ConvertPressureWait -> ReadPressure
//!      -> ConvertTemperature -> ConvertTemperatureWait -> ReadTemperature -> Idle
//! any transaction state -> Failed
//! ```
//!
//! # Failure policy
//!
//! Reset and PROM transactions allow no retries: without calibration data no
//! reading can be compensated. Conversion and ADC transactions retry up to
//! [`MAX_RETRIES`](crate::devices::transaction::MAX_RETRIES) times. `Failed`
//! is sticky until [`Ms5611Driver::reinit`].

use super::commands::{
    self, CMD_ADC_READ, CMD_CONVERT_D1_OSR4096, CMD_CONVERT_D2_OSR4096, CMD_RESET,
    CONVERSION_TIME_MS, PROM_COEFFICIENTS, RESET_TIME_MS,
};
use super::config::Ms5611Config;
use crate::communication::{AltimeterSample, Sample, TelemetryService};
use crate::devices::traits::Altimeter;
use crate::devices::transaction::{Command, I2cTransactionSlot, SlotEvent};
use crate::devices::ConfigError;
use crate::platform::{error::I2cError, traits::I2cBus};
use crate::{log_debug, log_error, log_info, log_warn};
use payload_core::baro::{altitude_m, compensate};
use payload_core::traits::TimeSource;

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ms5611State {
    /// Send the reset command
    Reset,
    /// Wait for the PROM reload
    ResetWait,
    /// Read PROM coefficient C(n+1)
    ReadCoefficient(u8),
    /// Waiting for the next period
    Idle,
    ConvertPressure,
    ConvertPressureWait,
    ReadPressure,
    ConvertTemperature,
    ConvertTemperatureWait,
    ReadTemperature,
    /// Unrecoverable error; no further transactions
    Failed,
}

/// MS5611 driver
pub struct Ms5611Driver {
    config: Ms5611Config,
    state: Ms5611State,
    slot: I2cTransactionSlot,
    buffer: [u8; 3],

    prom: [u16; PROM_COEFFICIENTS],
    d1: u32,
    d2: u32,
    p0: i32,
    p0_set: bool,

    pressure: i32,
    temperature: i32,
    altitude: f32,
    last_reading_time: u32,

    conv_start_time: u32,
    cycle_start: Option<u32>,
}

impl Ms5611Driver {
    /// Validate `config` and prepare the reset sequence
    ///
    /// No bus traffic happens until the first [`Self::service`] call.
    pub fn new(config: Ms5611Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let (p0, p0_set) = match config.preset_p0() {
            Some(p0) => (p0, true),
            None => (0, false),
        };

        Ok(Self {
            config,
            state: Ms5611State::Reset,
            slot: I2cTransactionSlot::new(),
            buffer: [0; 3],
            prom: [0; PROM_COEFFICIENTS],
            d1: 0,
            d2: 0,
            p0,
            p0_set,
            pressure: 0,
            temperature: 0,
            altitude: 0.0,
            last_reading_time: 0,
            conv_start_time: 0,
            cycle_start: None,
        })
    }

    /// Restart from the reset sequence
    ///
    /// Calibration is discarded and re-read. The last committed reading stays
    /// readable until a new cycle completes.
    pub fn reinit(&mut self) {
        log_info!("MS5611: reinitializing");
        self.slot.reset();
        self.state = Ms5611State::Reset;
        self.prom = [0; PROM_COEFFICIENTS];
        self.d1 = 0;
        self.d2 = 0;
        self.cycle_start = None;
        if self.config.preset_p0().is_none() {
            self.p0_set = false;
        }
    }

    /// Current state
    pub fn state(&self) -> Ms5611State {
        self.state
    }

    /// Configuration the driver was created with
    pub fn config(&self) -> &Ms5611Config {
        &self.config
    }

    /// PROM coefficients C1..C6
    pub fn prom(&self) -> &[u16; PROM_COEFFICIENTS] {
        &self.prom
    }

    /// Raw pressure ADC value of the last cycle
    pub fn d1(&self) -> u32 {
        self.d1
    }

    /// Raw temperature ADC value of the last cycle
    pub fn d2(&self) -> u32 {
        self.d2
    }

    /// Reference pressure, once set
    pub fn p0(&self) -> Option<i32> {
        self.p0_set.then_some(self.p0)
    }

    /// A transaction is in flight
    pub fn i2c_in_progress(&self) -> bool {
        self.slot.i2c_in_progress()
    }

    /// Advance the state machine by one step
    pub fn service<B, T, S>(&mut self, bus: &mut B, time: &T, telemetry: &mut S)
    where
        B: I2cBus,
        T: TimeSource,
        S: TelemetryService,
    {
        match self.state {
            Ms5611State::Failed => return,
            Ms5611State::Idle => {
                self.service_idle(time);
                return;
            }
            Ms5611State::ResetWait => {
                if time.elapsed_since(self.conv_start_time) >= RESET_TIME_MS {
                    self.state = Ms5611State::ReadCoefficient(0);
                }
                return;
            }
            Ms5611State::ConvertPressureWait => {
                if time.elapsed_since(self.conv_start_time) >= CONVERSION_TIME_MS {
                    self.state = Ms5611State::ReadPressure;
                }
                return;
            }
            Ms5611State::ConvertTemperatureWait => {
                if time.elapsed_since(self.conv_start_time) >= CONVERSION_TIME_MS {
                    self.state = Ms5611State::ReadTemperature;
                }
                return;
            }
            _ => {}
        }

        match self.slot.service(bus, time, &mut self.buffer) {
            SlotEvent::Idle => {
                if let Some(command) = self.command() {
                    if let SlotEvent::Failed(e) = self.slot.issue(bus, time, command) {
                        self.fail(e);
                    }
                }
            }
            SlotEvent::Busy => {}
            SlotEvent::Complete => self.complete(time, telemetry),
            SlotEvent::Failed(e) => self.fail(e),
        }
    }

    fn service_idle<T: TimeSource>(&mut self, time: &T) {
        let due = match self.cycle_start {
            None => true,
            Some(start) => time.elapsed_since(start) >= self.config.period_ms,
        };
        if due {
            self.cycle_start = Some(time.now_ms());
            self.state = Ms5611State::ConvertPressure;
        }
    }

    /// Command for the current state, if it issues one
    fn command(&self) -> Option<Command> {
        let address = self.config.address;
        let command = match self.state {
            Ms5611State::Reset => Command::write(address, &[CMD_RESET]).with_retries(0),
            Ms5611State::ReadCoefficient(index) => {
                Command::read(address, commands::prom_read(index as usize), 2).with_retries(0)
            }
            Ms5611State::ConvertPressure => Command::write(address, &[CMD_CONVERT_D1_OSR4096]),
            Ms5611State::ConvertTemperature => Command::write(address, &[CMD_CONVERT_D2_OSR4096]),
            Ms5611State::ReadPressure | Ms5611State::ReadTemperature => {
                Command::read(address, CMD_ADC_READ, 3)
            }
            _ => return None,
        };
        Some(command)
    }

    fn complete<T: TimeSource, S: TelemetryService>(&mut self, time: &T, telemetry: &mut S) {
        match self.state {
            Ms5611State::Reset => {
                self.conv_start_time = time.now_ms();
                self.state = Ms5611State::ResetWait;
            }
            Ms5611State::ReadCoefficient(index) => {
                self.prom[index as usize] = u16::from_be_bytes([self.buffer[0], self.buffer[1]]);
                if index as usize + 1 < PROM_COEFFICIENTS {
                    self.state = Ms5611State::ReadCoefficient(index + 1);
                } else {
                    log_info!("MS5611: PROM {:?}", self.prom);
                    self.state = Ms5611State::Idle;
                }
            }
            Ms5611State::ConvertPressure => {
                self.conv_start_time = time.now_ms();
                self.state = Ms5611State::ConvertPressureWait;
            }
            Ms5611State::ReadPressure => match self.adc_value() {
                Some(d1) => {
                    self.d1 = d1;
                    self.state = Ms5611State::ConvertTemperature;
                }
                None => self.restart_cycle(),
            },
            Ms5611State::ConvertTemperature => {
                self.conv_start_time = time.now_ms();
                self.state = Ms5611State::ConvertTemperatureWait;
            }
            Ms5611State::ReadTemperature => match self.adc_value() {
                Some(d2) => {
                    self.d2 = d2;
                    self.commit_reading(time.now_ms(), telemetry);
                    self.state = Ms5611State::Idle;
                }
                None => self.restart_cycle(),
            },
            _ => {}
        }
    }

    /// 24-bit ADC result, `None` if read before the conversion finished
    fn adc_value(&self) -> Option<u32> {
        let value = u32::from_be_bytes([0, self.buffer[0], self.buffer[1], self.buffer[2]]);
        (value != 0).then_some(value)
    }

    fn restart_cycle(&mut self) {
        log_warn!("MS5611: ADC read returned 0, restarting conversion");
        self.state = Ms5611State::ConvertPressure;
    }

    fn commit_reading<S: TelemetryService>(&mut self, now: u32, telemetry: &mut S) {
        let reading = compensate(&self.prom, self.d1, self.d2);
        self.pressure = reading.pressure;
        self.temperature = reading.temperature;

        if self.config.calc_altitude {
            if !self.p0_set {
                self.p0 = reading.pressure;
                self.p0_set = true;
                log_info!("MS5611: reference pressure {} Pa", self.p0);
            }
            self.altitude = altitude_m(self.pressure, self.p0);
        }

        self.last_reading_time = now;
        log_debug!(
            "MS5611: {} Pa, {} cC, {} m",
            self.pressure,
            self.temperature,
            self.altitude
        );

        telemetry.publish_sample(&Sample::Altimeter(AltimeterSample {
            time_ms: now,
            pressure: self.pressure,
            temperature: self.temperature,
            altitude: self.altitude,
        }));
    }

    fn fail(&mut self, error: I2cError) {
        log_error!("MS5611: {:?} failed: {}", self.state, error);
        self.state = Ms5611State::Failed;
    }
}

impl Altimeter for Ms5611Driver {
    fn pressure(&self) -> i32 {
        self.pressure
    }

    fn temperature(&self) -> i32 {
        self.temperature
    }

    fn altitude(&self) -> f32 {
        self.altitude
    }

    fn last_reading_time(&self) -> u32 {
        self.last_reading_time
    }

    fn is_failed(&self) -> bool {
        self.state == Ms5611State::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::{MockTelemetry, NullTelemetry};
    use crate::devices::transaction::MAX_RETRIES;
    use crate::platform::mock::MockI2cBus;
    use payload_core::traits::MockTime;

    const ADDR: u8 = 0x77;
    const PROM: [u16; 6] = [40127, 36924, 23317, 23282, 33464, 28312];
    const D1: u32 = 9_085_466;
    const D2: u32 = 8_569_150;

    fn bus_with_prom() -> MockI2cBus {
        let mut bus = MockI2cBus::new();
        for (i, c) in PROM.iter().enumerate() {
            bus.set_register(ADDR, commands::prom_read(i), &c.to_be_bytes());
        }
        bus
    }

    fn queue_cycle(bus: &mut MockI2cBus, d1: u32, d2: u32) {
        bus.queue_response(ADDR, CMD_ADC_READ, &d1.to_be_bytes()[1..]);
        bus.queue_response(ADDR, CMD_ADC_READ, &d2.to_be_bytes()[1..]);
    }

    /// Service once per simulated millisecond until `done` or `limit` calls
    fn run_until<F>(
        driver: &mut Ms5611Driver,
        bus: &mut MockI2cBus,
        time: &MockTime,
        telemetry: &mut MockTelemetry,
        limit: usize,
        done: F,
    ) -> bool
    where
        F: Fn(&Ms5611Driver) -> bool,
    {
        for _ in 0..limit {
            driver.service(bus, time, telemetry);
            if done(driver) {
                return true;
            }
            time.advance(1);
        }
        false
    }

    #[test]
    fn test_new_starts_in_reset() {
        let driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        assert_eq!(driver.state(), Ms5611State::Reset);
        assert_eq!(driver.prom(), &[0; 6]);
        assert_eq!(driver.last_reading_time(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Ms5611Config {
            address: 0x10,
            ..Default::default()
        };
        assert!(matches!(
            Ms5611Driver::new(config),
            Err(ConfigError::InvalidAddress(0x10))
        ));
    }

    #[test]
    fn test_reset_and_prom_sequence() {
        let mut bus = bus_with_prom();
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        // Issue reset, observe completion
        driver.service(&mut bus, &time, &mut telemetry);
        driver.service(&mut bus, &time, &mut telemetry);
        assert_eq!(driver.state(), Ms5611State::ResetWait);

        // Reset wait is time gated
        time.advance(RESET_TIME_MS - 1);
        driver.service(&mut bus, &time, &mut telemetry);
        assert_eq!(driver.state(), Ms5611State::ResetWait);
        time.advance(1);
        driver.service(&mut bus, &time, &mut telemetry);
        assert_eq!(driver.state(), Ms5611State::ReadCoefficient(0));

        for _ in 0..12 {
            driver.service(&mut bus, &time, &mut telemetry);
        }
        assert_eq!(driver.state(), Ms5611State::Idle);
        assert_eq!(driver.prom(), &PROM);

        let sent = bus.transactions();
        assert_eq!(sent[0].write_data(), [CMD_RESET]);
        for (i, t) in sent[1..].iter().enumerate() {
            assert_eq!(t.write_data(), [commands::prom_read(i)]);
        }
    }

    #[test]
    fn test_datasheet_cycle_end_to_end() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));

        assert_eq!(driver.d1(), D1);
        assert_eq!(driver.d2(), D2);
        assert_eq!(driver.temperature(), 2007);
        assert_eq!(driver.pressure(), 100_009);
        // First reading becomes the reference
        assert_eq!(driver.p0(), Some(100_009));
        assert!(driver.altitude().abs() < 1e-3);
        assert_eq!(driver.state(), Ms5611State::Idle);

        let samples = telemetry.altimeter_samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pressure, 100_009);
        assert_eq!(samples[0].temperature, 2007);
        assert_eq!(samples[0].time_ms, driver.last_reading_time());
    }

    #[test]
    fn test_conversion_waits_for_adc() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            100,
            |d| d.state() == Ms5611State::ConvertPressureWait
        ));
        let started = time.now_ms();
        let issued = bus.transaction_count();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            100,
            |d| d.state() == Ms5611State::ReadPressure
        ));
        assert!(time.elapsed_since(started) >= CONVERSION_TIME_MS);
        assert_eq!(bus.transaction_count(), issued);
    }

    #[test]
    fn test_idle_is_idempotent_until_period() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));
        let issued = bus.transaction_count();
        let reading = driver.last_reading_time();

        for _ in 0..20 {
            driver.service(&mut bus, &time, &mut telemetry);
        }
        assert_eq!(bus.transaction_count(), issued);
        assert_eq!(driver.state(), Ms5611State::Idle);
        assert_eq!(driver.last_reading_time(), reading);
    }

    #[test]
    fn test_periodic_readings() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        queue_cycle(&mut bus, D1, 8_000_000);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            500,
            |d| d.temperature() == -61
        ));
        assert_eq!(driver.pressure(), 95_989);

        let samples = telemetry.altimeter_samples();
        assert_eq!(samples.len(), 2);
        assert!(samples[1].time_ms - samples[0].time_ms >= 100);
        // Lower pressure than the reference reads as positive altitude
        assert!(samples[1].altitude > 0.0);
    }

    #[test]
    fn test_preset_reference_pressure() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let config = Ms5611Config {
            p0: Some(101_325),
            ..Default::default()
        };
        let mut driver = Ms5611Driver::new(config).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));
        assert_eq!(driver.p0(), Some(101_325));
        let expected = altitude_m(100_009, 101_325);
        assert!((driver.altitude() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_altitude_disabled() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, 8_000_000);
        let time = MockTime::with_initial(1);
        let config = Ms5611Config {
            calc_altitude: false,
            p0: Some(101_325),
            ..Default::default()
        };
        let mut driver = Ms5611Driver::new(config).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));
        assert_eq!(driver.altitude(), 0.0);
    }

    #[test]
    fn test_prom_failure_is_fatal() {
        let mut bus = bus_with_prom();
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = NullTelemetry;

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut MockTelemetry::default(),
            50,
            |d| d.state() == Ms5611State::ReadCoefficient(2)
        ));
        bus.fail_next(1);
        for _ in 0..4 {
            driver.service(&mut bus, &time, &mut telemetry);
        }
        assert_eq!(driver.state(), Ms5611State::Failed);
        assert!(driver.is_failed());

        // No retry and no further traffic
        let issued = bus.transaction_count();
        for _ in 0..50 {
            time.advance(10);
            driver.service(&mut bus, &time, &mut telemetry);
        }
        assert_eq!(bus.transaction_count(), issued);
        assert_eq!(bus.transactions_to(ADDR, commands::prom_read(2)).len(), 1);
    }

    #[test]
    fn test_retry_bound_keeps_stale_reading() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));
        let reading_time = driver.last_reading_time();

        bus.fail_next(usize::MAX);
        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            500,
            |d| d.is_failed()
        ));
        // Initial attempt plus the retry budget
        assert_eq!(
            bus.transactions_to(ADDR, CMD_CONVERT_D1_OSR4096).len(),
            1 + 1 + MAX_RETRIES as usize
        );

        let issued = bus.transaction_count();
        for _ in 0..100 {
            time.advance(5);
            driver.service(&mut bus, &time, &mut telemetry);
        }
        assert_eq!(bus.transaction_count(), issued);
        assert_eq!(driver.pressure(), 100_009);
        assert_eq!(driver.temperature(), 2007);
        assert_eq!(driver.last_reading_time(), reading_time);
    }

    #[test]
    fn test_zero_adc_restarts_cycle() {
        let mut bus = bus_with_prom();
        bus.queue_response(ADDR, CMD_ADC_READ, &[0, 0, 0]);
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            300,
            |d| d.last_reading_time() != 0
        ));
        assert_eq!(driver.pressure(), 100_009);
        assert_eq!(bus.transactions_to(ADDR, CMD_CONVERT_D1_OSR4096).len(), 2);
        assert_eq!(telemetry.altimeter_samples().len(), 1);
    }

    #[test]
    fn test_reinit_recovers_from_failure() {
        let mut bus = bus_with_prom();
        bus.fail_next(1);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        driver.service(&mut bus, &time, &mut telemetry);
        driver.service(&mut bus, &time, &mut telemetry);
        assert!(driver.is_failed());

        driver.reinit();
        assert_eq!(driver.state(), Ms5611State::Reset);
        queue_cycle(&mut bus, D1, D2);
        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));
        assert_eq!(driver.pressure(), 100_009);
    }

    #[test]
    fn test_transient_adc_failure_is_retried() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            100,
            |d| d.state() == Ms5611State::ReadPressure
        ));
        bus.fail_next(1);
        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            100,
            |d| d.last_reading_time() != 0
        ));

        assert!(!driver.is_failed());
        assert_eq!(driver.d1(), D1);
        assert_eq!(driver.temperature(), 2007);
        assert_eq!(driver.pressure(), 100_009);
        // Pressure read twice, temperature once
        assert_eq!(bus.transactions_to(ADDR, CMD_ADC_READ).len(), 3);
        assert_eq!(telemetry.altimeter_samples().len(), 1);
    }

    #[test]
    fn test_reinit_clears_captured_reference() {
        let mut bus = bus_with_prom();
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        // Non-positive preset behaves like no preset
        let config = Ms5611Config {
            p0: Some(0),
            ..Default::default()
        };
        let mut driver = Ms5611Driver::new(config).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();
        assert_eq!(driver.p0(), None);

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            200,
            |d| d.last_reading_time() != 0
        ));
        assert_eq!(driver.p0(), Some(100_009));

        driver.reinit();
        assert_eq!(driver.p0(), None);
        // Last reading stays readable
        assert_eq!(driver.pressure(), 100_009);
    }

    #[test]
    fn test_reinit_keeps_preset_reference() {
        let config = Ms5611Config {
            p0: Some(101_325),
            ..Default::default()
        };
        let mut driver = Ms5611Driver::new(config).unwrap();
        driver.reinit();
        assert_eq!(driver.p0(), Some(101_325));
    }

    #[test]
    fn test_one_transaction_in_flight() {
        let mut bus = bus_with_prom();
        bus.set_latency(3);
        queue_cycle(&mut bus, D1, D2);
        let time = MockTime::with_initial(1);
        let mut driver = Ms5611Driver::new(Ms5611Config::default()).unwrap();
        let mut telemetry = MockTelemetry::without_buffers();

        assert!(run_until(
            &mut driver,
            &mut bus,
            &time,
            &mut telemetry,
            400,
            |d| d.last_reading_time() != 0
        ));
        assert_eq!(bus.max_in_flight(), 1);
        assert_eq!(driver.pressure(), 100_009);
    }
}
