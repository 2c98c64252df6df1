//! Barometric altimeter read accessors

/// Last-value accessors for a pressure altimeter
///
/// Values change only when a full pressure and temperature cycle completes.
pub trait Altimeter {
    /// Compensated pressure (Pa)
    fn pressure(&self) -> i32;

    /// Compensated temperature (0.01 °C)
    fn temperature(&self) -> i32;

    /// Altitude above the reference pressure (m); 0 when disabled
    fn altitude(&self) -> f32;

    /// Completion time of the last cycle (ms)
    fn last_reading_time(&self) -> u32;

    /// Driver stopped after an unrecoverable error
    fn is_failed(&self) -> bool;
}
