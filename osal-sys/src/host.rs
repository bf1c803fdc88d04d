// SPDX-License-Identifier: Apache-2.0

//! Host kernel port.
//!
//! This port runs the OSAL on top of `std` threads so that drivers and the OSAL itself can be
//! exercised on a development machine.  It models the parts of a real-time kernel that the OSAL
//! depends on:
//!
//! - A single kernel lock.  Every kernel object is only modified with it held, and every blocking
//!   call waits on a condition variable paired with it.  Task and ISR lock flavours are the same
//!   lock.
//! - ISR context, entered with [`isr`].  Blocking calls made inside it are refused with `-EINVAL`
//!   instead of blocking.
//! - Tasks with a base and an effective priority, created with [`spawn`].  Threads not created
//!   through [`spawn`] are registered lazily at [`Priority::NORMAL`].  The host scheduler does not
//!   honor priorities; they are tracked so that priority inheritance can be observed.
//!
//! One tick is `1 / TICKS_PER_SEC` seconds of wall clock time.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use crate::port::{LockKey, Port};
use crate::{k_timeout_t, K_FOREVER};

mod mutex;
mod semaphore;
mod task;

pub use mutex::HostMutex;
pub use semaphore::HostSemaphore;
pub use task::{current, spawn, Priority, TaskRef};

/// Tick rate of the host kernel.
pub const TICKS_PER_SEC: u32 = 1000;

/// The host kernel.
#[derive(Debug)]
pub struct Host;

static KERNEL: Mutex<()> = Mutex::new(());
static BOOT: OnceLock<Instant> = OnceLock::new();

const KEY_NESTED: usize = 0;
const KEY_OUTER: usize = 1;

std::thread_local! {
    // The kernel lock, while held by this thread through `lock`.
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    static IN_ISR: Cell<bool> = const { Cell::new(false) };
}

/// Acquire the kernel lock for a kernel call.
pub(crate) fn kernel() -> MutexGuard<'static, ()> {
    KERNEL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether this thread is inside `lock`/`unlock`.
pub(crate) fn held() -> bool {
    HELD.with(|held| held.borrow().is_some())
}

/// Run `f` with the kernel lock held, reusing it if this thread already holds it.
pub(crate) fn with_kernel<R>(f: impl FnOnce() -> R) -> R {
    if held() {
        f()
    } else {
        let _guard = kernel();
        f()
    }
}

pub(crate) fn in_isr() -> bool {
    IN_ISR.with(Cell::get)
}

/// Convert a tick count to wall clock time.
pub(crate) fn ticks_to_duration(ticks: u64) -> Duration {
    let hz = TICKS_PER_SEC as u64;
    Duration::from_secs(ticks / hz) + Duration::from_nanos((ticks % hz) * 1_000_000_000 / hz)
}

/// The instant a timeout expires at, `None` for [`K_FOREVER`].
pub(crate) fn deadline(timeout: k_timeout_t) -> Option<Instant> {
    if timeout == K_FOREVER || timeout.ticks < 0 {
        None
    } else {
        Some(Instant::now() + ticks_to_duration(timeout.ticks as u64))
    }
}

/// Wait on `cv` until notified or until `deadline`.  Returns the reacquired kernel lock, and
/// whether the deadline has passed.
pub(crate) fn wait_until(
    cv: &Condvar,
    guard: MutexGuard<'static, ()>,
    deadline: Option<Instant>,
) -> (MutexGuard<'static, ()>, bool) {
    match deadline {
        None => (cv.wait(guard).unwrap_or_else(PoisonError::into_inner), false),
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return (guard, true);
            }
            let (guard, _) = cv
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            (guard, Instant::now() >= deadline)
        }
    }
}

/// Run `f` as if it were an interrupt handler.
///
/// Inside `f`, [`Port::in_isr`] reports true and the blocking calls of the port fail instead of
/// blocking.  Nesting is allowed.
pub fn isr<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(bool);

    impl Drop for Restore {
        fn drop(&mut self) {
            IN_ISR.with(|flag| flag.set(self.0));
        }
    }

    let _restore = Restore(IN_ISR.with(|flag| flag.replace(true)));
    f()
}

unsafe impl Port for Host {
    type Semaphore = HostSemaphore;
    type Mutex = HostMutex;

    const TICKS_PER_SEC: u32 = TICKS_PER_SEC;

    fn lock() -> LockKey {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if held.is_some() {
                LockKey(KEY_NESTED)
            } else {
                *held = Some(kernel());
                LockKey(KEY_OUTER)
            }
        })
    }

    unsafe fn unlock(key: LockKey) {
        if key.0 == KEY_OUTER {
            let guard = HELD.with(|held| held.borrow_mut().take());
            drop(guard);
        }
    }

    fn lock_from_isr() -> LockKey {
        Self::lock()
    }

    unsafe fn unlock_from_isr(key: LockKey) {
        Self::unlock(key)
    }

    fn in_isr() -> bool {
        in_isr()
    }

    fn sleep(timeout: k_timeout_t) {
        match deadline(timeout) {
            Some(deadline) => {
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                }
            }
            None => loop {
                std::thread::park();
            },
        }
    }

    fn uptime_ticks() -> u64 {
        let elapsed = BOOT.get_or_init(Instant::now).elapsed();
        let hz = TICKS_PER_SEC as u64;
        elapsed.as_secs() * hz + elapsed.subsec_nanos() as u64 * hz / 1_000_000_000
    }

    fn str_out(s: &[u8]) {
        // Console output is best effort.
        let _ = std::io::stderr().write_all(s);
    }
}
