#![deny(missing_docs)]
//! Shared logging utilities for the formscrape workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. While an input row is
//! being scraped, the orchestrator registers its id here so that every message
//! logged on that thread is prefixed with `[row N]`.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the input row currently being processed.
    static CURRENT_ROW: Cell<Option<i64>> = const { Cell::new(None) };
}

/// Marks `row_id` as the input row in flight on the current thread.
pub fn set_current_row(row_id: i64) {
    CURRENT_ROW.with(|v| v.set(Some(row_id)));
}

/// Clears the row context for the current thread.
pub fn clear_current_row() {
    CURRENT_ROW.with(|v| v.set(None));
}

/// Retrieves the input row in flight on the current thread, if any.
pub fn current_row() -> Option<i64> {
    CURRENT_ROW.with(|v| v.get())
}

/// Renders the message prefix for the current row context.
///
/// Returns an empty string outside of a row. Used by the logging macros; not
/// meant to be called directly.
#[doc(hidden)]
pub fn row_prefix() -> String {
    match current_row() {
        Some(id) => format!("[row {id}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::row_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::{clear_current_row, current_row, row_prefix, set_current_row};

    #[test]
    fn row_context_is_prefixed_and_cleared() {
        assert_eq!(row_prefix(), "");
        set_current_row(42);
        assert_eq!(current_row(), Some(42));
        assert_eq!(row_prefix(), "[row 42] ");
        clear_current_row();
        assert_eq!(current_row(), None);
        assert_eq!(row_prefix(), "");
    }

    #[test]
    fn row_context_is_per_thread() {
        set_current_row(7);
        let other = std::thread::spawn(current_row).join().unwrap();
        assert_eq!(other, None);
        clear_current_row();
    }
}
