// SPDX-License-Identifier: Apache-2.0

//! # OSAL errors
//!
//! The raw kernel calls return an int result where negative values correspond with errnos.
//! Convert those to a `Result` whose `Error` names the failure the driver has to deal with.
//!
//! Timeouts and an exhausted pool are ordinary outcomes.  The layer never retries on its own:
//! every failure is handed back to the caller.

use core::ffi::c_int;
use core::fmt;

use crate::raw::{EAGAIN, EBUSY, EDEADLK, EINVAL, ENOMEM, EPERM, ETIMEDOUT};

/// An OSAL error.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bounded wait expired before the condition was satisfied.  A wait with no timeout that
    /// could not be satisfied immediately also reports this.
    Timeout,
    /// No free slot in a pool.  Returned by ISR sends on a full queue.
    ResourceExhausted,
    /// A mutex was released by a task that does not hold it.
    NotOwner,
    /// The call is not allowed in this context, for example blocking from an ISR or locking a
    /// mutex the caller already holds.  Only reported when the kernel detects it.
    Misuse,
    /// The wait was ended by a reset of the object rather than by a signal.
    Reset,
    /// Any other kernel errno.
    Errno(u32),
}

impl Error {
    /// Classify a (positive) errno.
    pub const fn from_errno(errno: u32) -> Error {
        match errno {
            ETIMEDOUT | EBUSY => Error::Timeout,
            ENOMEM => Error::ResourceExhausted,
            EPERM => Error::NotOwner,
            EINVAL | EDEADLK => Error::Misuse,
            EAGAIN => Error::Reset,
            other => Error::Errno(other),
        }
    }

    /// The errno this error corresponds to.
    pub const fn errno(&self) -> u32 {
        match *self {
            Error::Timeout => ETIMEDOUT,
            Error::ResourceExhausted => ENOMEM,
            Error::NotOwner => EPERM,
            Error::Misuse => EINVAL,
            Error::Reset => EAGAIN,
            Error::Errno(errno) => errno,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Error::Timeout => "timeout",
            Error::ResourceExhausted => "resource exhausted",
            Error::NotOwner => "not owner",
            Error::Misuse => "misuse",
            Error::Reset => "reset",
            Error::Errno(_) => "kernel error",
        }
    }
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "osal error: {} (errno:{})", self.describe(), self.errno())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "osal error: {} (errno:{})", self.describe(), self.errno())
    }
}

/// Wraps a value with a possible OSAL error.
pub type Result<T> = core::result::Result<T, Error>;

/// Map a return result from the kernel into an Result.
///
/// Negative return results being considered errors.
#[inline(always)]
pub fn to_result(code: c_int) -> Result<c_int> {
    if code < 0 {
        Err(Error::from_errno(code.unsigned_abs()))
    } else {
        Ok(code)
    }
}

/// Map a return result, with a void result.
#[inline(always)]
pub fn to_result_void(code: c_int) -> Result<()> {
    to_result(code).map(|_| ())
}
