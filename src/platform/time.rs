//! Embassy-based time source implementation.
//!
//! This module provides the `EmbassyTime` implementation of the
//! `TimeSource` trait using Embassy's time driver.

use payload_core::traits::TimeSource;

/// Embassy-based time source using the Embassy time driver.
///
/// The 64-bit Embassy instant is truncated to the 32-bit millisecond tick
/// the drivers use; elapsed-time checks wrap correctly across the truncation.
///
/// # Example
///
/// ```ignore
/// use payload_avionics::platform::EmbassyTime;
/// use payload_core::traits::TimeSource;
///
/// let time = EmbassyTime;
/// let now = time.now_ms();
/// ```
#[derive(Clone, Copy, Default)]
pub struct EmbassyTime;

impl TimeSource for EmbassyTime {
    fn now_ms(&self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}
