// SPDX-License-Identifier: Apache-2.0

//! Raw kernel bindings for the OSAL.
//!
//! This crate is the lowest layer of the OSAL.  It defines the [`Port`] contract that an
//! underlying real-time kernel has to satisfy, and exposes the selected kernel through a set of
//! C-style free functions (`k_sem_take`, `k_mutex_lock`, ...) that the safe `osal` crate wraps.
//!
//! The functions here follow the kernel calling convention: a return of `0` is success, and a
//! negative value is a negated errno.  Functions with an `_i` suffix are "I-class": they never
//! block, and must be called with the kernel lock held (see [`k_lock`] and [`k_lock_from_isr`]).
//!
//! Exactly one kernel port is selected at build time through a cargo feature.  Currently the only
//! port is `host`, which runs on top of `std` threads.

#![no_std]
// Keep the kernel's C naming for the raw types.
#![allow(non_camel_case_types)]
#![deny(missing_docs)]

#[cfg(feature = "host")]
extern crate std;

use core::ffi::c_int;

pub mod port;

#[cfg(feature = "host")]
pub mod host;

pub use port::{LockKey, Port, RawMutex, RawSemaphore};

cfg_if::cfg_if! {
    if #[cfg(feature = "host")] {
        /// The kernel selected for this build.
        pub type Kernel = host::Host;
    } else {
        compile_error!("No kernel port selected.  Enable the `host` feature of osal-sys.");
    }
}

/// The kernel-native semaphore storage.
pub type k_sem = <Kernel as Port>::Semaphore;

/// The kernel-native priority-inheriting mutex storage.
pub type k_mutex = <Kernel as Port>::Mutex;

/// Kernel tick count type.
pub type k_ticks_t = i64;

/// Kernel-native timeout.
///
/// `ticks` is the number of system ticks to wait.  The two distinguished values are
/// [`K_FOREVER`] and [`K_NO_WAIT`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct k_timeout_t {
    /// Ticks to wait, or one of the distinguished values.
    pub ticks: k_ticks_t,
}

/// Wait as long as necessary.
pub const K_FOREVER: k_timeout_t = k_timeout_t { ticks: -1 };

/// Do not wait.  Try the operation once.
pub const K_NO_WAIT: k_timeout_t = k_timeout_t { ticks: 0 };

/// Maximum count limit of a semaphore.
pub const K_SEM_MAX_LIMIT: u32 = u32::MAX;

/// Operation not permitted.  Returned when a mutex is released by a task that does not hold it.
pub const EPERM: u32 = 1;
/// Try again.  Returned to waiters released by a reset.
pub const EAGAIN: u32 = 11;
/// Out of memory.  No free object in a pool.
pub const ENOMEM: u32 = 12;
/// Device or resource busy.  Returned when a non-blocking take fails.
pub const EBUSY: u32 = 16;
/// Invalid argument.  Returned when a blocking call is made from ISR context.
pub const EINVAL: u32 = 22;
/// Resource deadlock would occur.  Returned for a recursive mutex lock.
pub const EDEADLK: u32 = 35;
/// Timed out.
pub const ETIMEDOUT: u32 = 116;

/// Convert an errno into the negative return code used by the raw calls.
#[inline(always)]
pub const fn neg(errno: u32) -> c_int {
    -(errno as c_int)
}

/// Tick rate of the selected kernel.
pub const CONFIG_SYS_CLOCK_TICKS_PER_SEC: u32 = <Kernel as Port>::TICKS_PER_SEC;

/// Initialize a semaphore with an initial count and a count limit.
#[inline]
pub fn k_sem_init(sem: &k_sem, count: u32, limit: u32) {
    sem.init(count, limit)
}

/// Take a semaphore, waiting at most `timeout`.
#[inline]
pub fn k_sem_take(sem: &k_sem, timeout: k_timeout_t) -> c_int {
    sem.take(timeout)
}

/// Give a semaphore from task context.
#[inline]
pub fn k_sem_give(sem: &k_sem) -> c_int {
    sem.give()
}

/// Reset a semaphore to `count`, releasing all waiters with `-EAGAIN`.
#[inline]
pub fn k_sem_reset(sem: &k_sem, count: u32) {
    sem.reset(count)
}

/// Take a semaphore without blocking.
///
/// # Safety
///
/// The kernel lock must be held by the caller.
#[inline]
pub unsafe fn k_sem_take_i(sem: &k_sem) -> c_int {
    sem.take_i()
}

/// Give a semaphore.  Any woken task runs at the next scheduling point.
///
/// # Safety
///
/// The kernel lock must be held by the caller.
#[inline]
pub unsafe fn k_sem_give_i(sem: &k_sem) -> c_int {
    sem.give_i()
}

/// Read the current count of a semaphore.
///
/// # Safety
///
/// The kernel lock must be held by the caller.
#[inline]
pub unsafe fn k_sem_count_get_i(sem: &k_sem) -> u32 {
    sem.count_i()
}

/// Initialize a mutex.
#[inline]
pub fn k_mutex_init(mutex: &k_mutex) {
    mutex.init()
}

/// Lock a mutex, waiting at most `timeout`.
#[inline]
pub fn k_mutex_lock(mutex: &k_mutex, timeout: k_timeout_t) -> c_int {
    mutex.lock(timeout)
}

/// Unlock a mutex held by the calling task.
#[inline]
pub fn k_mutex_unlock(mutex: &k_mutex) -> c_int {
    mutex.unlock()
}

/// Enter the kernel lock from task context.
#[inline]
pub fn k_lock() -> LockKey {
    Kernel::lock()
}

/// Leave the kernel lock entered with [`k_lock`].
///
/// # Safety
///
/// `key` must come from the matching [`k_lock`] call on this task, and locks must be released in
/// reverse order of acquisition.
#[inline]
pub unsafe fn k_unlock(key: LockKey) {
    Kernel::unlock(key)
}

/// Enter the kernel lock from ISR context.
#[inline]
pub fn k_lock_from_isr() -> LockKey {
    Kernel::lock_from_isr()
}

/// Leave the kernel lock entered with [`k_lock_from_isr`].
///
/// # Safety
///
/// Same requirements as [`k_unlock`].
#[inline]
pub unsafe fn k_unlock_from_isr(key: LockKey) {
    Kernel::unlock_from_isr(key)
}

/// Returns true when called from ISR context.
#[inline]
pub fn k_is_in_isr() -> bool {
    Kernel::in_isr()
}

/// Put the calling task to sleep.
#[inline]
pub fn k_sleep(timeout: k_timeout_t) {
    Kernel::sleep(timeout)
}

/// Ticks elapsed since the kernel started.
#[inline]
pub fn k_uptime_ticks() -> u64 {
    Kernel::uptime_ticks()
}

/// Write raw bytes to the kernel console.
#[inline]
pub fn k_str_out(s: &[u8]) {
    Kernel::str_out(s)
}
