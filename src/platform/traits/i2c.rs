//! I2C transaction manager trait
//!
//! This module defines the queued, non-blocking I2C interface that the
//! sensor drivers are written against. A transaction is submitted with
//! [`I2cBus::begin_transaction`] and its outcome collected later with
//! [`I2cBus::poll_transaction`]; neither call may block.

use crate::platform::{error::I2cError, Result};

/// Handle for a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransactionId(pub u8);

/// Progress of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionStatus {
    /// Still queued or on the wire
    Pending,
    /// Completed; read data (if any) has been copied out
    Success,
    /// Completed with an error
    Failed(I2cError),
}

/// I2C transaction manager
///
/// Implementations may complete transactions from interrupt context; the
/// drivers only observe completion through `poll_transaction`.
///
/// # Contract
///
/// - Address must be 7-bit (valid range: 0x00..=0x7F)
/// - A transaction writes `write` then, if `read_len > 0`, reads `read_len`
///   bytes after a repeated START
/// - Once `poll_transaction` returns `Success` or `Failed` the id is
///   released and must not be polled again
pub trait I2cBus {
    /// Queue a transaction
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::I2c(I2cError::QueueFull)` if no transaction
    /// slot is free, `I2cError::InvalidAddress` for addresses above 0x7F, and
    /// `PlatformError::InvalidConfig` if the request exceeds the manager's
    /// buffer capacity.
    fn begin_transaction(&mut self, address: u8, write: &[u8], read_len: usize)
        -> Result<TransactionId>;

    /// Check a transaction's progress
    ///
    /// On `Success`, the first `read_len` bytes of `read_buf` receive the
    /// data read from the device.
    fn poll_transaction(&mut self, id: TransactionId, read_buf: &mut [u8]) -> TransactionStatus;
}

impl<B: I2cBus + ?Sized> I2cBus for &mut B {
    fn begin_transaction(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<TransactionId> {
        (**self).begin_transaction(address, write, read_len)
    }

    fn poll_transaction(&mut self, id: TransactionId, read_buf: &mut [u8]) -> TransactionStatus {
        (**self).poll_transaction(id, read_buf)
    }
}
