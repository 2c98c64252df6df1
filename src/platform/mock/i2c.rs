//! Mock I2C transaction manager for testing

use crate::platform::{
    error::{I2cError, PlatformError},
    traits::{I2cBus, TransactionId, TransactionStatus},
    Result,
};
use std::collections::{HashMap, VecDeque};
use std::vec::Vec;

/// I2C transaction type for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cTransaction {
    /// Write transaction
    Write { addr: u8, data: Vec<u8> },
    /// Write-Read transaction
    WriteRead {
        addr: u8,
        write_data: Vec<u8>,
        read_len: usize,
    },
}

impl I2cTransaction {
    /// Device address of the transaction
    pub fn addr(&self) -> u8 {
        match self {
            I2cTransaction::Write { addr, .. } | I2cTransaction::WriteRead { addr, .. } => *addr,
        }
    }

    /// Bytes written (register address first)
    pub fn write_data(&self) -> &[u8] {
        match self {
            I2cTransaction::Write { data, .. } => data,
            I2cTransaction::WriteRead { write_data, .. } => write_data,
        }
    }
}

struct InFlight {
    polls_left: u32,
    outcome: core::result::Result<Vec<u8>, I2cError>,
}

/// Mock I2C transaction manager
///
/// Records all transactions for test verification. Reads are answered from
/// a register map keyed by `(address, first written byte)`; one-shot
/// responses queued with [`MockI2cBus::queue_response`] take precedence,
/// and unknown registers read as zeros.
///
/// Completion is deferred by a configurable number of polls, and failures
/// can be scripted for the next N transactions.
#[derive(Default)]
pub struct MockI2cBus {
    transactions: Vec<I2cTransaction>,
    registers: HashMap<(u8, u8), Vec<u8>>,
    queued: HashMap<(u8, u8), VecDeque<Vec<u8>>>,
    in_flight: HashMap<u8, InFlight>,
    next_id: u8,
    latency_polls: u32,
    fail_remaining: usize,
    failure: Option<I2cError>,
    queue_full: bool,
    max_in_flight: usize,
}

impl MockI2cBus {
    /// Create a new mock bus that completes on the first poll
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data returned for reads of `reg` on device `addr`
    pub fn set_register(&mut self, addr: u8, reg: u8, data: &[u8]) {
        self.registers.insert((addr, reg), data.to_vec());
    }

    /// Queue a one-shot response for the next read of `reg` on `addr`
    pub fn queue_response(&mut self, addr: u8, reg: u8, data: &[u8]) {
        self.queued
            .entry((addr, reg))
            .or_default()
            .push_back(data.to_vec());
    }

    /// Number of polls returning `Pending` before a transaction completes
    pub fn set_latency(&mut self, polls: u32) {
        self.latency_polls = polls;
    }

    /// Make the next `count` transactions complete with a NACK
    pub fn fail_next(&mut self, count: usize) {
        self.fail_next_with(count, I2cError::Nack);
    }

    /// Make the next `count` transactions complete with `error`
    pub fn fail_next_with(&mut self, count: usize, error: I2cError) {
        self.fail_remaining = count;
        self.failure = Some(error);
    }

    /// Refuse new transactions with `QueueFull` while set
    pub fn set_queue_full(&mut self, full: bool) {
        self.queue_full = full;
    }

    /// Get transaction log (for test verification)
    pub fn transactions(&self) -> Vec<I2cTransaction> {
        self.transactions.clone()
    }

    /// Clear transaction log
    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    /// Number of transactions started so far
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Most recent transaction, if any
    pub fn last_transaction(&self) -> Option<&I2cTransaction> {
        self.transactions.last()
    }

    /// Transactions whose first written byte is `reg`
    pub fn transactions_to(&self, addr: u8, reg: u8) -> Vec<I2cTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.addr() == addr && t.write_data().first() == Some(&reg))
            .cloned()
            .collect()
    }

    /// Transactions currently awaiting a completion poll
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Peak number of simultaneously outstanding transactions
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    fn read_response(&mut self, addr: u8, reg: u8, read_len: usize) -> Vec<u8> {
        let mut data = match self.queued.get_mut(&(addr, reg)).and_then(|q| q.pop_front()) {
            Some(data) => data,
            None => self.registers.get(&(addr, reg)).cloned().unwrap_or_default(),
        };
        data.resize(read_len, 0);
        data
    }
}

impl I2cBus for MockI2cBus {
    fn begin_transaction(
        &mut self,
        address: u8,
        write: &[u8],
        read_len: usize,
    ) -> Result<TransactionId> {
        if self.queue_full {
            return Err(PlatformError::I2c(I2cError::QueueFull));
        }
        if address > 0x7F {
            return Err(PlatformError::I2c(I2cError::InvalidAddress));
        }

        self.transactions.push(if read_len == 0 {
            I2cTransaction::Write {
                addr: address,
                data: write.to_vec(),
            }
        } else {
            I2cTransaction::WriteRead {
                addr: address,
                write_data: write.to_vec(),
                read_len,
            }
        });

        let outcome = match self.failure {
            Some(error) if self.fail_remaining > 0 => {
                self.fail_remaining -= 1;
                Err(error)
            }
            _ if read_len == 0 => Ok(Vec::new()),
            _ => {
                let reg = write.first().copied().unwrap_or(0);
                Ok(self.read_response(address, reg, read_len))
            }
        };

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.in_flight.insert(
            id,
            InFlight {
                polls_left: self.latency_polls,
                outcome,
            },
        );
        self.max_in_flight = self.max_in_flight.max(self.in_flight.len());

        Ok(TransactionId(id))
    }

    fn poll_transaction(&mut self, id: TransactionId, read_buf: &mut [u8]) -> TransactionStatus {
        let Some(pending) = self.in_flight.get_mut(&id.0) else {
            return TransactionStatus::Failed(I2cError::BusError);
        };

        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return TransactionStatus::Pending;
        }

        match self.in_flight.remove(&id.0).map(|p| p.outcome) {
            Some(Ok(data)) => {
                let len = data.len().min(read_buf.len());
                read_buf[..len].copy_from_slice(&data[..len]);
                TransactionStatus::Success
            }
            Some(Err(e)) => TransactionStatus::Failed(e),
            None => TransactionStatus::Failed(I2cError::BusError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_bus_write() {
        let mut bus = MockI2cBus::new();
        let id = bus.begin_transaction(0x50, &[0x01, 0x02, 0x03], 0).unwrap();
        assert_eq!(bus.poll_transaction(id, &mut []), TransactionStatus::Success);

        let transactions = bus.transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(
            transactions[0],
            I2cTransaction::Write {
                addr: 0x50,
                data: vec![0x01, 0x02, 0x03]
            }
        );
    }

    #[test]
    fn test_mock_bus_register_read() {
        let mut bus = MockI2cBus::new();
        bus.set_register(0x52, 0xA0, &[0x12, 0x34]);

        let id = bus.begin_transaction(0x52, &[0xA0], 3).unwrap();
        let mut buf = [0xFFu8; 3];
        assert_eq!(bus.poll_transaction(id, &mut buf), TransactionStatus::Success);
        // Short register data is zero padded
        assert_eq!(buf, [0x12, 0x34, 0x00]);
    }

    #[test]
    fn test_mock_bus_queued_responses_take_precedence() {
        let mut bus = MockI2cBus::new();
        bus.set_register(0x77, 0x00, &[0, 0, 1]);
        bus.queue_response(0x77, 0x00, &[0, 0, 9]);

        let mut buf = [0u8; 3];
        let id = bus.begin_transaction(0x77, &[0x00], 3).unwrap();
        bus.poll_transaction(id, &mut buf);
        assert_eq!(buf, [0, 0, 9]);

        let id = bus.begin_transaction(0x77, &[0x00], 3).unwrap();
        bus.poll_transaction(id, &mut buf);
        assert_eq!(buf, [0, 0, 1]);
    }

    #[test]
    fn test_mock_bus_latency_and_failures() {
        let mut bus = MockI2cBus::new();
        bus.set_latency(2);
        bus.fail_next(1);

        let id = bus.begin_transaction(0x68, &[0x75], 1).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(bus.poll_transaction(id, &mut buf), TransactionStatus::Pending);
        assert_eq!(bus.poll_transaction(id, &mut buf), TransactionStatus::Pending);
        assert_eq!(
            bus.poll_transaction(id, &mut buf),
            TransactionStatus::Failed(I2cError::Nack)
        );
        assert_eq!(bus.in_flight(), 0);
        assert_eq!(bus.max_in_flight(), 1);
    }

    #[test]
    fn test_mock_bus_queue_full() {
        let mut bus = MockI2cBus::new();
        bus.set_queue_full(true);
        assert_eq!(
            bus.begin_transaction(0x68, &[0x6B], 0),
            Err(PlatformError::I2c(I2cError::QueueFull))
        );
        assert_eq!(bus.transaction_count(), 0);
    }
}
