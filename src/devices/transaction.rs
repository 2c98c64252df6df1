//! Single-transaction issue/poll/retry engine shared by the sensor FSMs
//!
//! Each driver owns one [`I2cTransactionSlot`]. The slot holds the
//! marshaled command so a retry re-sends identical bytes, tracks the
//! in-flight transaction id, and runs the optional post-command settle
//! wait. At most one transaction is outstanding per slot.
//!
//! A driver step looks like:
//!
//! ```ignore
//! match self.slot.service(bus, time, &mut self.buffer) {
//!     SlotEvent::Idle => { self.slot.issue(bus, time, command_for(self.state)); }
//!     SlotEvent::Busy => {}
//!     SlotEvent::Complete => self.advance(),
//!     SlotEvent::Failed(e) => self.fail(e),
//! }
//! ```

use crate::platform::{
    error::{I2cError, PlatformError},
    traits::{I2cBus, TransactionId, TransactionStatus},
};
use crate::{log_debug, log_warn};
use payload_core::traits::TimeSource;

/// Default number of re-issues after a failed transaction
pub const MAX_RETRIES: u8 = 3;

/// Largest register write (register address included)
pub const MAX_WRITE_LEN: usize = 8;

/// One marshaled I2C command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// 7-bit device address
    pub address: u8,
    write: [u8; MAX_WRITE_LEN],
    write_len: usize,
    /// Bytes read after the write (0 for a pure write)
    pub read_len: usize,
    /// Settle time after success before the command counts as complete (ms)
    pub post_wait_ms: u32,
    /// Re-issues allowed after a failure (0 = first failure is final)
    pub max_retries: u8,
}

impl Command {
    /// Write `bytes` (register address first) to `address`
    ///
    /// Writes longer than [`MAX_WRITE_LEN`] are rejected at compile time:
    ///
    /// ```compile_fail
    /// use payload_avionics::devices::transaction::Command;
    ///
    /// let _ = Command::write(0x68, &[0u8; 9]);
    /// ```
    pub fn write<const N: usize>(address: u8, bytes: &[u8; N]) -> Self {
        const { assert!(N <= MAX_WRITE_LEN, "register write exceeds MAX_WRITE_LEN") };
        let mut write = [0; MAX_WRITE_LEN];
        write[..N].copy_from_slice(bytes);
        Self {
            address,
            write,
            write_len: N,
            read_len: 0,
            post_wait_ms: 0,
            max_retries: MAX_RETRIES,
        }
    }

    /// Read `len` bytes starting at register `reg`
    pub fn read(address: u8, reg: u8, len: usize) -> Self {
        Self {
            read_len: len,
            ..Self::write(address, &[reg])
        }
    }

    /// Wait `ms` after the transaction succeeds
    pub fn with_post_wait(mut self, ms: u32) -> Self {
        self.post_wait_ms = ms;
        self
    }

    /// Bytes written, register address first
    pub fn write_bytes(&self) -> &[u8] {
        &self.write[..self.write_len]
    }

    /// Override the retry limit
    pub fn with_retries(mut self, max_retries: u8) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Outcome of one [`I2cTransactionSlot::service`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotEvent {
    /// Nothing issued; the caller may issue the next command
    Idle,
    /// Transaction in flight, settle wait running, or re-issue pending
    Busy,
    /// The command succeeded (and its settle wait elapsed); read data is in
    /// the buffer passed to this call
    Complete,
    /// The command failed and its retries are exhausted
    Failed(I2cError),
}

/// Issue/poll/retry state for one descriptor
#[derive(Debug, Default)]
pub struct I2cTransactionSlot {
    command: Option<Command>,
    t_id: Option<TransactionId>,
    cmd_ready: bool,
    retry_count: u8,
    post_cmd_wait: bool,
    wait_start: u32,
    draining: bool,
}

impl I2cTransactionSlot {
    /// Create an idle slot
    pub const fn new() -> Self {
        Self {
            command: None,
            t_id: None,
            cmd_ready: false,
            retry_count: 0,
            post_cmd_wait: false,
            wait_start: 0,
            draining: false,
        }
    }

    /// A transaction has been submitted and not yet observed complete
    pub fn i2c_in_progress(&self) -> bool {
        self.t_id.is_some()
    }

    /// A command is marshaled and awaiting completion
    pub fn cmd_ready(&self) -> bool {
        self.cmd_ready
    }

    /// Failures of the current command so far
    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// The post-command settle wait is running
    pub fn post_cmd_wait(&self) -> bool {
        self.post_cmd_wait
    }

    /// Nothing marshaled, in flight, or draining
    pub fn is_idle(&self) -> bool {
        !self.cmd_ready && self.t_id.is_none() && !self.draining
    }

    /// Marshal `command` and submit it
    ///
    /// Returns `Busy` once submitted (or queued for re-submission when the
    /// bus is full), or `Failed` if the bus rejected it outright and no
    /// retries are allowed.
    pub fn issue<B: I2cBus, T: TimeSource>(
        &mut self,
        bus: &mut B,
        time: &T,
        command: Command,
    ) -> SlotEvent {
        self.command = Some(command);
        self.cmd_ready = true;
        self.retry_count = 0;
        self.post_cmd_wait = false;
        self.wait_start = time.now_ms();
        self.begin(bus)
    }

    /// Advance by one step
    ///
    /// `read_buf` receives read data when the in-flight transaction
    /// completes; it must hold at least the command's `read_len` bytes.
    pub fn service<B: I2cBus, T: TimeSource>(
        &mut self,
        bus: &mut B,
        time: &T,
        read_buf: &mut [u8],
    ) -> SlotEvent {
        if let Some(id) = self.t_id {
            let status = bus.poll_transaction(id, read_buf);
            if self.draining {
                if status != TransactionStatus::Pending {
                    self.t_id = None;
                    self.draining = false;
                }
                return SlotEvent::Busy;
            }
            return match status {
                TransactionStatus::Pending => SlotEvent::Busy,
                TransactionStatus::Success => {
                    self.t_id = None;
                    self.on_success(time)
                }
                TransactionStatus::Failed(e) => {
                    self.t_id = None;
                    self.on_failure(bus, e)
                }
            };
        }

        if self.post_cmd_wait {
            let wait_ms = self.command.as_ref().map_or(0, |c| c.post_wait_ms);
            if time.elapsed_since(self.wait_start) < wait_ms {
                return SlotEvent::Busy;
            }
            self.post_cmd_wait = false;
            self.cmd_ready = false;
            return SlotEvent::Complete;
        }

        if self.cmd_ready {
            return self.begin(bus);
        }

        SlotEvent::Idle
    }

    /// Drop the current command
    ///
    /// A transaction already on the bus cannot be cancelled; it is polled to
    /// completion on later calls and its result discarded.
    pub fn reset(&mut self) {
        self.command = None;
        self.cmd_ready = false;
        self.retry_count = 0;
        self.post_cmd_wait = false;
        self.draining = self.t_id.is_some();
    }

    fn begin<B: I2cBus>(&mut self, bus: &mut B) -> SlotEvent {
        let Some(command) = self.command.as_ref() else {
            self.cmd_ready = false;
            return SlotEvent::Idle;
        };

        match bus.begin_transaction(command.address, command.write_bytes(), command.read_len) {
            Ok(id) => {
                self.t_id = Some(id);
                SlotEvent::Busy
            }
            // Leave the command marshaled; re-submitted on the next call
            Err(PlatformError::I2c(I2cError::QueueFull)) => SlotEvent::Busy,
            Err(PlatformError::I2c(e)) => self.on_rejected(e),
            Err(PlatformError::InvalidConfig) => self.on_rejected(I2cError::BusError),
        }
    }

    fn on_success<T: TimeSource>(&mut self, time: &T) -> SlotEvent {
        let wait_ms = self.command.as_ref().map_or(0, |c| c.post_wait_ms);
        if wait_ms > 0 {
            self.post_cmd_wait = true;
            self.wait_start = time.now_ms();
            return SlotEvent::Busy;
        }
        self.cmd_ready = false;
        SlotEvent::Complete
    }

    fn on_failure<B: I2cBus>(&mut self, bus: &mut B, error: I2cError) -> SlotEvent {
        if !self.consume_retry(error) {
            return SlotEvent::Failed(error);
        }
        self.begin(bus)
    }

    fn on_rejected(&mut self, error: I2cError) -> SlotEvent {
        if !self.consume_retry(error) {
            return SlotEvent::Failed(error);
        }
        // Re-submitted on the next call
        SlotEvent::Busy
    }

    /// Count a failure; returns false when the retry budget is spent
    fn consume_retry(&mut self, error: I2cError) -> bool {
        let (address, max_retries) = self
            .command
            .as_ref()
            .map_or((0, 0), |c| (c.address, c.max_retries));

        if self.retry_count >= max_retries {
            log_debug!(
                "I2C {:#x}: giving up after {} retries: {}",
                address,
                self.retry_count,
                error
            );
            self.cmd_ready = false;
            return false;
        }

        self.retry_count += 1;
        log_warn!(
            "I2C {:#x}: {}, retry {}/{}",
            address,
            error,
            self.retry_count,
            max_retries
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{I2cTransaction, MockI2cBus};
    use payload_core::traits::MockTime;

    #[test]
    fn test_write_completes_after_poll() {
        let mut bus = MockI2cBus::new();
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Idle);
        assert_eq!(
            slot.issue(&mut bus, &time, Command::write(0x68, &[0x6B, 0x01])),
            SlotEvent::Busy
        );
        assert!(slot.i2c_in_progress());
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Complete);
        assert!(slot.is_idle());
        assert_eq!(
            bus.transactions(),
            vec![I2cTransaction::Write {
                addr: 0x68,
                data: vec![0x6B, 0x01]
            }]
        );
    }

    #[test]
    fn test_full_length_write_is_sent_intact() {
        let mut bus = MockI2cBus::new();
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();
        let bytes = [0x13, 1, 2, 3, 4, 5, 6, 7];

        let command = Command::write(0x68, &bytes);
        assert_eq!(command.write_bytes(), bytes);
        assert_eq!(Command::read(0x68, 0x3B, 14).write_bytes(), [0x3B]);

        slot.issue(&mut bus, &time, command);
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Complete);
        assert_eq!(bus.last_transaction().map(|t| t.write_data()), Some(&bytes[..]));
    }

    #[test]
    fn test_read_fills_buffer() {
        let mut bus = MockI2cBus::new();
        bus.set_register(0x68, 0x75, &[0x71]);
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        slot.issue(&mut bus, &time, Command::read(0x68, 0x75, 1));
        let mut buf = [0u8; 1];
        assert_eq!(slot.service(&mut bus, &time, &mut buf), SlotEvent::Complete);
        assert_eq!(buf, [0x71]);
    }

    #[test]
    fn test_post_wait_gates_completion() {
        let mut bus = MockI2cBus::new();
        let time = MockTime::with_initial(500);
        let mut slot = I2cTransactionSlot::new();

        slot.issue(
            &mut bus,
            &time,
            Command::write(0x68, &[0x6B, 0x80]).with_post_wait(100),
        );
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
        assert!(slot.post_cmd_wait());

        time.advance(99);
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
        time.advance(1);
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Complete);
    }

    #[test]
    fn test_retries_then_fails() {
        let mut bus = MockI2cBus::new();
        bus.fail_next(10);
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        slot.issue(&mut bus, &time, Command::write(0x77, &[0x1E]));
        for expected_retry in 1..=MAX_RETRIES {
            assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
            assert_eq!(slot.retry_count(), expected_retry);
        }
        assert_eq!(
            slot.service(&mut bus, &time, &mut []),
            SlotEvent::Failed(I2cError::Nack)
        );
        // Initial attempt plus MAX_RETRIES re-issues of identical bytes
        let sent = bus.transactions();
        assert_eq!(sent.len(), 1 + MAX_RETRIES as usize);
        assert!(sent.iter().all(|t| t.write_data() == [0x1E]));
        assert!(slot.is_idle());
    }

    #[test]
    fn test_zero_retry_command_fails_immediately() {
        let mut bus = MockI2cBus::new();
        bus.fail_next(1);
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        slot.issue(&mut bus, &time, Command::read(0x77, 0xA2, 2).with_retries(0));
        assert_eq!(
            slot.service(&mut bus, &time, &mut [0u8; 2]),
            SlotEvent::Failed(I2cError::Nack)
        );
        assert_eq!(bus.transaction_count(), 1);
    }

    #[test]
    fn test_queue_full_does_not_consume_retry() {
        let mut bus = MockI2cBus::new();
        bus.set_queue_full(true);
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        assert_eq!(
            slot.issue(&mut bus, &time, Command::write(0x68, &[0x6B, 0x01])),
            SlotEvent::Busy
        );
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
        assert_eq!(slot.retry_count(), 0);
        assert!(!slot.i2c_in_progress());

        bus.set_queue_full(false);
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
        assert!(slot.i2c_in_progress());
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Complete);
    }

    #[test]
    fn test_pending_transaction_is_not_reissued() {
        let mut bus = MockI2cBus::new();
        bus.set_latency(5);
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        slot.issue(&mut bus, &time, Command::read(0x68, 0x3B, 22));
        for _ in 0..5 {
            assert_eq!(slot.service(&mut bus, &time, &mut [0u8; 22]), SlotEvent::Busy);
        }
        assert_eq!(bus.transaction_count(), 1);
        assert_eq!(bus.max_in_flight(), 1);
    }

    #[test]
    fn test_reset_drains_in_flight_transaction() {
        let mut bus = MockI2cBus::new();
        bus.set_latency(1);
        let time = MockTime::new();
        let mut slot = I2cTransactionSlot::new();

        slot.issue(&mut bus, &time, Command::write(0x68, &[0x6B, 0x80]));
        slot.reset();
        assert!(!slot.is_idle());
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Busy);
        assert!(slot.is_idle());
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(slot.service(&mut bus, &time, &mut []), SlotEvent::Idle);
    }
}
