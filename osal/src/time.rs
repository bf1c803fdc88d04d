// SPDX-License-Identifier: Apache-2.0

//! Time types and the timed-wait conversion.
//!
//! Every blocking call in this crate takes its timeout as `impl Into<Timeout>`.  [`Timeout`] is a
//! thin wrapper around the kernel's native `k_timeout_t`, and the conversions below are the only
//! place where an abstract wait is turned into kernel ticks:
//!
//! - [`Forever`] waits as long as needed.
//! - [`NoWait`] tries exactly once.
//! - [`Duration`] is a tick based `fugit` duration at the kernel's tick rate.
//! - [`Millis`] is a millisecond count as a driver passes it around, where
//!   [`Millis::FOREVER`] is the "wait forever" sentinel and never a count.  Other values are
//!   rounded *up* to whole ticks so a bounded wait never ends early.
//!
//! [`sleep`] and [`delay_ms`] are the task delay.

use crate::raw::{k_ticks_t, k_timeout_t};
use crate::sys::{K_FOREVER, K_NO_WAIT};

/// The kernel tick counter.
pub type Tick = u64;

/// The kernel tick rate, in Hz.
pub const SYS_FREQUENCY: u32 = crate::raw::CONFIG_SYS_CLOCK_TICKS_PER_SEC;

/// Duration appropriate for kernel calls.
pub type Duration = fugit::Duration<Tick, 1, SYS_FREQUENCY>;

/// A point in time, in kernel ticks since boot.
pub type Instant = fugit::Instant<Tick, 1, SYS_FREQUENCY>;

/// Millisecond value that means "wait forever".
pub const WAIT_FOREVER_MS: u32 = u32::MAX;

/// Wait forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Forever;

/// Don't wait at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoWait;

/// A timeout in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Millis(pub u32);

impl Millis {
    /// The sentinel for an unbounded wait.
    pub const FOREVER: Millis = Millis(WAIT_FOREVER_MS);
}

/// A timeout as understood by the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout(pub k_timeout_t);

impl Timeout {
    /// Does this timeout wait forever?
    pub fn is_forever(&self) -> bool {
        self.0 == K_FOREVER
    }

    /// Does this timeout return immediately?
    pub fn is_no_wait(&self) -> bool {
        self.0 == K_NO_WAIT
    }

    /// The bound in ticks, or `None` for an unbounded wait.
    pub fn ticks(&self) -> Option<Tick> {
        if self.is_forever() {
            None
        } else {
            Some(self.0.ticks as Tick)
        }
    }
}

impl From<Forever> for Timeout {
    fn from(_value: Forever) -> Timeout {
        Timeout(K_FOREVER)
    }
}

impl From<NoWait> for Timeout {
    fn from(_value: NoWait) -> Timeout {
        Timeout(K_NO_WAIT)
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Timeout {
        // A bound that does not fit is as good as forever, but must not become the sentinel.
        let ticks = k_ticks_t::try_from(value.ticks()).unwrap_or(k_ticks_t::MAX);
        Timeout(k_timeout_t { ticks })
    }
}

impl From<Millis> for Timeout {
    fn from(value: Millis) -> Timeout {
        match value {
            Millis::FOREVER => Timeout(K_FOREVER),
            Millis(ms) => Timeout(k_timeout_t {
                ticks: ms_to_ticks(ms, SYS_FREQUENCY) as k_ticks_t,
            }),
        }
    }
}

/// Convert milliseconds to ticks at `hz`, rounding up.
pub const fn ms_to_ticks(ms: u32, hz: u32) -> Tick {
    (ms as Tick * hz as Tick).div_ceil(1000)
}

/// Put the current task to sleep for the given timeout.
///
/// Task context only.  Sleeping for [`Forever`] never returns.
pub fn sleep<T>(timeout: T)
where
    T: Into<Timeout>,
{
    let timeout: Timeout = timeout.into();
    crate::raw::k_sleep(timeout.0);
}

/// Delay the current task by `ms` milliseconds.
pub fn delay_ms(ms: u32) {
    sleep(Millis(ms))
}

/// The current time since boot.
pub fn now() -> Instant {
    Instant::from_ticks(crate::raw::k_uptime_ticks())
}
