//! Mock collaborators for host tests
//!
//! `MockI2cBus` stands in for the transaction manager: register-map
//! responses, scripted failures, completion latency and a transaction log.
//!
//! Compiled under `cfg(test)` and with the `mock` feature, so integration
//! tests in `tests/` can drive whole boards.
//!
//! # Example
//!
//! ```ignore
//! use payload_avionics::platform::mock::MockI2cBus;
//! use payload_avionics::platform::traits::{I2cBus, TransactionStatus};
//!
//! let mut bus = MockI2cBus::new();
//! bus.set_register(0x68, 0x75, &[0x71]);
//! let id = bus.begin_transaction(0x68, &[0x75], 1)?;
//! let mut who_am_i = [0u8; 1];
//! assert_eq!(bus.poll_transaction(id, &mut who_am_i), TransactionStatus::Success);
//! ```

#![cfg(any(test, feature = "mock"))]

mod i2c;

pub use i2c::{I2cTransaction, MockI2cBus};
