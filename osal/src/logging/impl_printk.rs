// SPDX-License-Identifier: Apache-2.0

//! Logging through printk
//!
//! This module implements a log handler (for the [`log`] crate) that logs messages through the
//! kernel console.  Filtering is global, at the configured maximum level.

use log::{Log, Metadata, Record, SetLoggerError};

use crate::printkln;

/// A simple log handler, built around printk.
struct PrintkLogger;

impl Log for PrintkLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= super::max_level()
    }

    // Print out the log message, using printkln.  The message is written in small chunks, so
    // records from concurrent tasks may interleave.
    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            printkln!("{}:{}: {}", record.level(), record.target(), record.args());
        }
    }

    // Flush is not needed.
    fn flush(&self) {}
}

static PRINTK_LOGGER: PrintkLogger = PrintkLogger;

/// Set the log handler to log messages through printk.
///
/// # Safety
///
/// This is unsafe due to racy issues in the log framework on targets that do not support atomic
/// pointers.  As long as this is called ever by a single task, it is safe to use.
pub unsafe fn set_logger() -> Result<(), SetLoggerError> {
    super::set_logger_internal(&PRINTK_LOGGER)
}
