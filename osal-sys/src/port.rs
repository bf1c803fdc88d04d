// SPDX-License-Identifier: Apache-2.0

//! The contract between the OSAL and an underlying kernel.
//!
//! A kernel port provides three things:
//!
//! - A counting semaphore with both a blocking task-context interface and non-blocking "I-class"
//!   calls that are legal with the kernel lock held, including from an ISR.
//! - A mutex that the kernel itself recognizes as priority-inheriting.  This must not be the
//!   counting semaphore reused with a count of one.
//! - A kernel lock (critical section) in a task and an ISR flavour, plus sleep, uptime and a
//!   console.
//!
//! # Safety
//!
//! The traits are `unsafe` because the safe OSAL builds memory-safety arguments on top of them.
//! In particular the queue relies on the kernel lock providing mutual exclusion between every task
//! and ISR that touches the same object, and on semaphore counts never being handed out twice.

use core::ffi::c_int;

use crate::k_timeout_t;

/// Opaque value returned by a lock call, and handed back on unlock.
///
/// For interrupt-masking kernels this is the saved interrupt state.  For the host kernel it
/// records whether the lock was already held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockKey(pub usize);

/// A kernel port.
///
/// # Safety
///
/// See the [module documentation](self).
pub unsafe trait Port: 'static {
    /// Kernel-native semaphore storage.
    type Semaphore: RawSemaphore;

    /// Kernel-native priority-inheriting mutex storage.
    type Mutex: RawMutex;

    /// System tick rate.
    const TICKS_PER_SEC: u32;

    /// Enter the kernel lock from task context.  Nested calls return a key that makes the
    /// matching unlock a no-op.
    fn lock() -> LockKey;

    /// Leave the kernel lock.
    ///
    /// # Safety
    ///
    /// `key` must come from the matching `lock` call.
    unsafe fn unlock(key: LockKey);

    /// Enter the kernel lock from ISR context.
    fn lock_from_isr() -> LockKey;

    /// Leave the kernel lock entered from ISR context.
    ///
    /// # Safety
    ///
    /// `key` must come from the matching `lock_from_isr` call.
    unsafe fn unlock_from_isr(key: LockKey);

    /// Whether the caller is running in ISR context.
    fn in_isr() -> bool;

    /// Suspend the calling task.
    fn sleep(timeout: k_timeout_t);

    /// Ticks since the kernel started.
    fn uptime_ticks() -> u64;

    /// Write to the console.
    fn str_out(s: &[u8]);
}

/// Kernel-native counting semaphore.
///
/// # Safety
///
/// See the [module documentation](self).
pub unsafe trait RawSemaphore: Send + Sync + Sized {
    /// Value used for static storage before `init` runs.
    const UNINIT: Self;

    /// Set the initial count and the limit.
    fn init(&self, count: u32, limit: u32);

    /// Take, waiting at most `timeout`.  Returns `0`, `-ETIMEDOUT`, `-EBUSY` (no wait),
    /// `-EAGAIN` (reset while waiting) or `-EINVAL` (blocking from ISR).
    fn take(&self, timeout: k_timeout_t) -> c_int;

    /// Give from task context.  Returns `-EBUSY` if the count is already at its limit.
    fn give(&self) -> c_int;

    /// Set the count and release every waiter with `-EAGAIN`.
    fn reset(&self, count: u32);

    /// Non-blocking take.
    ///
    /// # Safety
    ///
    /// The kernel lock must be held.
    unsafe fn take_i(&self) -> c_int;

    /// Give without rescheduling.
    ///
    /// # Safety
    ///
    /// The kernel lock must be held.
    unsafe fn give_i(&self) -> c_int;

    /// Current count.
    ///
    /// # Safety
    ///
    /// The kernel lock must be held.
    unsafe fn count_i(&self) -> u32;
}

/// Kernel-native mutex with priority inheritance.
///
/// # Safety
///
/// See the [module documentation](self).
pub unsafe trait RawMutex: Send + Sync + Sized {
    /// Value used for static storage before `init` runs.
    const UNINIT: Self;

    /// Put the mutex in the unlocked state.
    fn init(&self);

    /// Lock, waiting at most `timeout`.  While waiting, the holder runs at no less than the
    /// priority of the highest waiter.
    fn lock(&self, timeout: k_timeout_t) -> c_int;

    /// Unlock.  Returns `-EPERM` when the caller is not the holder.
    fn unlock(&self) -> c_int;
}
