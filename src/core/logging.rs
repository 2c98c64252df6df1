//! Logging abstraction
//!
//! Provides unified logging macros that work across different targets:
//! - Embedded (`defmt` feature): forwards to defmt over RTT
//! - Host tests: Uses println!
//! - Host non-test: No-op
//!
//! Format strings must stay within the subset both backends accept
//! (`{}`, `{:?}`, `{:#x}`), and logged enums derive `defmt::Format`
//! behind the `defmt` feature.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[INFO] {}", format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[WARN] {}", format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        eprintln!("[ERROR] {}", format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[DEBUG] {}", format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[TRACE] {}", format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_accept_format_arguments() {
        let address: u8 = 0x68;
        crate::log_info!("device at {:#x}", address);
        crate::log_warn!("retry {}/{}", 1, 3);
        crate::log_error!("failed");
        crate::log_debug!("value {:?}", [1, 2, 3]);
        crate::log_trace!("tick {}", 42u32);
    }
}
