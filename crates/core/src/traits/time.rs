//! Time abstraction traits for platform-agnostic timing operations.
//!
//! Drivers never block: every delay is expressed as an elapsed-tick gate
//! against a recorded start time. This module provides the `TimeSource`
//! trait that supplies those ticks, so the gates can be driven by the
//! Embassy time driver on target and by `MockTime` on the host.

use core::cell::Cell;

/// Monotonic millisecond tick counter.
///
/// Tick values are `u32` and wrap after roughly 49.7 days. All elapsed-time
/// arithmetic goes through [`TimeSource::elapsed_since`], which uses wrapping
/// subtraction so a rollover never stalls a pending wait.
///
/// # Example
///
/// ```
/// use payload_core::traits::{MockTime, TimeSource};
///
/// fn settle_done<T: TimeSource>(time: &T, wait_start: u32) -> bool {
///     time.elapsed_since(wait_start) >= 100
/// }
///
/// let time = MockTime::new();
/// assert!(!settle_done(&time, 0));
/// time.advance(100);
/// assert!(settle_done(&time, 0));
/// ```
pub trait TimeSource {
    /// Returns current time in milliseconds since system start.
    fn now_ms(&self) -> u32;

    /// Returns milliseconds elapsed since a reference tick.
    fn elapsed_since(&self, reference_ms: u32) -> u32 {
        self.now_ms().wrapping_sub(reference_ms)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock time source for testing with controllable time advancement.
///
/// ```
/// use payload_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// assert_eq!(time.now_ms(), 0);
///
/// time.advance(10);
/// assert_eq!(time.now_ms(), 10);
/// ```
#[derive(Clone, Default)]
pub struct MockTime {
    current_ms: Cell<u32>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at tick 0.
    pub fn new() -> Self {
        Self {
            current_ms: Cell::new(0),
        }
    }

    /// Creates a new `MockTime` starting at the specified tick.
    pub fn with_initial(ms: u32) -> Self {
        Self {
            current_ms: Cell::new(ms),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, ms: u32) {
        self.current_ms.set(ms);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, ms: u32) {
        self.current_ms.set(self.current_ms.get().wrapping_add(ms));
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u32 {
        self.current_ms.get()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
