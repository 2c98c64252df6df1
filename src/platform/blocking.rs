//! Transaction manager over a blocking `embedded-hal` I2C peripheral
//!
//! Boards without an interrupt-driven I2C engine can still run the
//! non-blocking drivers: `BlockingI2cBus` performs the whole transfer inside
//! `begin_transaction` and parks the outcome in a fixed slot table until the
//! driver polls it.
//!
//! # Example
//!
//! ```ignore
//! use payload_avionics::platform::BlockingI2cBus;
//!
//! let i2c = hal::i2c::I2c::new_blocking(p.I2C0, p.PIN_1, p.PIN_0, Default::default());
//! let mut bus = BlockingI2cBus::new(i2c);
//! ```

use crate::platform::{
    error::{I2cError, PlatformError},
    traits::{I2cBus, TransactionId, TransactionStatus},
    Result,
};
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;

/// Number of completed transactions that may await polling
pub const BLOCKING_SLOTS: usize = 4;

/// Largest single read the adapter buffers (one full FIFO burst)
pub const BLOCKING_MAX_READ: usize = 512;

struct Completed {
    id: u8,
    outcome: core::result::Result<Vec<u8, BLOCKING_MAX_READ>, I2cError>,
}

/// Blocking `embedded-hal` I2C peripheral adapted to [`I2cBus`]
pub struct BlockingI2cBus<I> {
    i2c: I,
    completed: Vec<Completed, BLOCKING_SLOTS>,
    next_id: u8,
}

impl<I: I2c> BlockingI2cBus<I> {
    /// Wrap an initialized I2C peripheral
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            completed: Vec::new(),
            next_id: 0,
        }
    }

    /// Release the wrapped peripheral
    pub fn release(self) -> I {
        self.i2c
    }

    fn allocate_id(&mut self) -> u8 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            if !self.completed.iter().any(|c| c.id == id) {
                return id;
            }
        }
    }
}

impl<I: I2c> I2cBus for BlockingI2cBus<I> {
    fn begin_transaction(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<TransactionId> {
        if address > 0x7F {
            return Err(PlatformError::I2c(I2cError::InvalidAddress));
        }
        if read_len > BLOCKING_MAX_READ {
            return Err(PlatformError::InvalidConfig);
        }
        if self.completed.is_full() {
            return Err(PlatformError::I2c(I2cError::QueueFull));
        }

        let mut data: Vec<u8, BLOCKING_MAX_READ> = Vec::new();
        // read_len is bounded by the capacity checked above
        let _ = data.resize(read_len, 0);

        let result = if read_len == 0 {
            self.i2c.write(address, write)
        } else if write.is_empty() {
            self.i2c.read(address, &mut data)
        } else {
            self.i2c.write_read(address, write, &mut data)
        };

        let id = self.allocate_id();
        let outcome = result.map(|()| data).map_err(|e| map_error_kind(e.kind()));
        if self.completed.push(Completed { id, outcome }).is_err() {
            return Err(PlatformError::I2c(I2cError::QueueFull));
        }

        Ok(TransactionId(id))
    }

    fn poll_transaction(&mut self, id: TransactionId, read_buf: &mut [u8]) -> TransactionStatus {
        let Some(index) = self.completed.iter().position(|c| c.id == id.0) else {
            return TransactionStatus::Failed(I2cError::BusError);
        };

        match self.completed.swap_remove(index).outcome {
            Ok(data) => {
                let len = data.len().min(read_buf.len());
                read_buf[..len].copy_from_slice(&data[..len]);
                TransactionStatus::Success
            }
            Err(e) => TransactionStatus::Failed(e),
        }
    }
}

/// Map `embedded-hal` error kinds to platform I2C errors
fn map_error_kind(kind: ErrorKind) -> I2cError {
    match kind {
        ErrorKind::NoAcknowledge(_) => I2cError::Nack,
        ErrorKind::ArbitrationLoss => I2cError::ArbitrationLost,
        _ => I2cError::BusError,
    }
}
