// SPDX-License-Identifier: Apache-2.0

//! Logging
//!
//! Everything in this crate logs through the [`log`] facade, and only at `trace` and `debug`
//! level: object creation, resets, queue slots given back after a failed send, and guard
//! unlock failures.  A default build prints nothing.
//!
//! With `CONFIG_PRINTK` set, [`set_logger`] installs a logger that writes each record to the
//! kernel console through printk.  Without it, [`set_logger`] does nothing.  The maximum level
//! comes from `CONFIG_OSAL_LOG_LEVEL`: 0 off, 1 error, 2 warn, 3 info, 4 debug, 5 trace.

use log::{LevelFilter, SetLoggerError};

cfg_if::cfg_if! {
    if #[cfg(CONFIG_PRINTK)] {
        mod impl_printk;
        pub use impl_printk::set_logger;
    } else {
        /// No console is configured, so there is nowhere to log to.
        ///
        /// # Safety
        ///
        /// Nothing is installed, this is always safe.
        pub unsafe fn set_logger() -> Result<(), SetLoggerError> {
            Ok(())
        }
    }
}

/// The maximum level configured for this build.
pub fn max_level() -> LevelFilter {
    level_from_config(crate::kconfig::CONFIG_OSAL_LOG_LEVEL)
}

fn level_from_config(level: isize) -> LevelFilter {
    match level {
        i if i <= 0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

// The Rust logging system has different entry points based on whether or not we are on a target
// with atomic pointers.  We will provide a single function for this.  The safety has to do with
// initialization order, and as long as this is called before any other tasks run, it is safe.
cfg_if::cfg_if! {
    if #[cfg(target_has_atomic = "ptr")] {
        #[allow(dead_code)]
        unsafe fn set_logger_internal(logger: &'static dyn log::Log) -> Result<(), SetLoggerError> {
            log::set_logger(logger)?;
            log::set_max_level(max_level());
            Ok(())
        }
    } else {
        #[allow(dead_code)]
        unsafe fn set_logger_internal(logger: &'static dyn log::Log) -> Result<(), SetLoggerError> {
            log::set_logger_racy(logger)?;
            log::set_max_level_racy(max_level());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_levels() {
        assert_eq!(level_from_config(-1), LevelFilter::Off);
        assert_eq!(level_from_config(0), LevelFilter::Off);
        assert_eq!(level_from_config(3), LevelFilter::Info);
        assert_eq!(level_from_config(5), LevelFilter::Trace);
        assert_eq!(level_from_config(9), LevelFilter::Trace);
    }
}
