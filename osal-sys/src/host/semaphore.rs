// SPDX-License-Identifier: Apache-2.0

//! Host counting semaphore.

use core::ffi::c_int;
use core::sync::atomic::{AtomicU32, Ordering};

use std::sync::Condvar;

use super::{deadline, held, in_isr, kernel, wait_until, with_kernel};
use crate::port::RawSemaphore;
use crate::{k_timeout_t, neg, EAGAIN, EBUSY, EDEADLK, EINVAL, ETIMEDOUT, K_NO_WAIT, K_SEM_MAX_LIMIT};

/// Semaphore storage for the host kernel.
///
/// The fields are atomics so that the type is `Sync`, but they are only modified with the kernel
/// lock held.  `epoch` advances on every reset so that waiters can tell a reset from a give.
#[derive(Debug)]
pub struct HostSemaphore {
    count: AtomicU32,
    limit: AtomicU32,
    epoch: AtomicU32,
    cv: Condvar,
}

unsafe impl RawSemaphore for HostSemaphore {
    #[allow(clippy::declare_interior_mutable_const)]
    const UNINIT: Self = HostSemaphore {
        count: AtomicU32::new(0),
        limit: AtomicU32::new(K_SEM_MAX_LIMIT),
        epoch: AtomicU32::new(0),
        cv: Condvar::new(),
    };

    fn init(&self, count: u32, limit: u32) {
        with_kernel(|| {
            self.limit.store(limit, Ordering::Relaxed);
            self.count.store(count.min(limit), Ordering::Relaxed);
        })
    }

    fn take(&self, timeout: k_timeout_t) -> c_int {
        if timeout == K_NO_WAIT {
            return with_kernel(|| unsafe { self.take_i() });
        }
        if in_isr() {
            return neg(EINVAL);
        }
        if held() {
            return neg(EDEADLK);
        }

        let deadline = deadline(timeout);
        let mut guard = kernel();
        let epoch = self.epoch.load(Ordering::Relaxed);
        let mut timed_out = false;
        loop {
            if self.epoch.load(Ordering::Relaxed) != epoch {
                return neg(EAGAIN);
            }
            let count = self.count.load(Ordering::Relaxed);
            if count > 0 {
                self.count.store(count - 1, Ordering::Relaxed);
                return 0;
            }
            if timed_out {
                return neg(ETIMEDOUT);
            }
            (guard, timed_out) = wait_until(&self.cv, guard, deadline);
        }
    }

    fn give(&self) -> c_int {
        with_kernel(|| unsafe { self.give_i() })
    }

    fn reset(&self, count: u32) {
        with_kernel(|| {
            let limit = self.limit.load(Ordering::Relaxed);
            self.count.store(count.min(limit), Ordering::Relaxed);
            self.epoch.fetch_add(1, Ordering::Relaxed);
            self.cv.notify_all();
        })
    }

    unsafe fn take_i(&self) -> c_int {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return neg(EBUSY);
        }
        self.count.store(count - 1, Ordering::Relaxed);
        0
    }

    unsafe fn give_i(&self) -> c_int {
        let count = self.count.load(Ordering::Relaxed);
        if count >= self.limit.load(Ordering::Relaxed) {
            return neg(EBUSY);
        }
        self.count.store(count + 1, Ordering::Relaxed);
        // Waiters only run once the kernel lock is released.
        self.cv.notify_one();
        0
    }

    unsafe fn count_i(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}
