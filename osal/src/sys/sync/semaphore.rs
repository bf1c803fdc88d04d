// SPDX-License-Identifier: Apache-2.0

//! Counting semaphore.
//!
//! A thin wrapper around the kernel's `k_sem`.  The semaphore is created holding `capacity`
//! permits, and [`reset`] puts it back there.  The count limit is the kernel maximum, so posting
//! never fails on the host kernel; the result is kept for kernels that cap the count.
//!
//! There are two post paths.  [`post`] is the ordinary task-context signal.  [`post_from_isr`]
//! does the same inside the kernel's ISR lock and never switches context itself: a task it wakes
//! runs at the next scheduling point.
//!
//! [`reset`]: Semaphore::reset
//! [`post`]: Semaphore::post
//! [`post_from_isr`]: Semaphore::post_from_isr

use core::fmt;

use log::{debug, trace};

use crate::{
    error::{to_result_void, Result},
    object::{StaticKernelObject, Wrapped},
    raw::{
        k_sem, k_sem_count_get_i, k_sem_give, k_sem_give_i, k_sem_init, k_sem_reset, k_sem_take,
        k_sem_take_i, RawSemaphore,
    },
    sys::critical::KernelLock,
    time::Timeout,
};

pub use crate::raw::K_SEM_MAX_LIMIT;

/// A kernel semaphore usable from safe Rust code.
///
/// This is the handle returned by [`StaticSemaphore::init_once`].  It is `Copy`, and borrows the
/// definition it was created from.
#[derive(Clone, Copy)]
pub struct Semaphore<'a> {
    capacity: u32,
    item: &'a k_sem,
}

impl<'a> Semaphore<'a> {
    pub(crate) fn from_raw(item: &'a k_sem, capacity: u32) -> Semaphore<'a> {
        Semaphore { capacity, item }
    }

    /// Wait for the semaphore.
    ///
    /// Blocks until the count is positive, then takes one permit.  Returns
    /// [`Error::Timeout`] if the timeout expires first, and [`Error::Reset`] if the wait was ended
    /// by [`reset`](Self::reset).
    ///
    /// Task context only.  A [`NoWait`] wait never blocks, and may also be used from an ISR.
    ///
    /// [`Error::Timeout`]: crate::Error::Timeout
    /// [`Error::Reset`]: crate::Error::Reset
    /// [`NoWait`]: crate::time::NoWait
    pub fn wait<T>(&self, timeout: T) -> Result<()>
    where
        T: Into<Timeout>,
    {
        let timeout: Timeout = timeout.into();
        to_result_void(k_sem_take(self.item, timeout.0))
    }

    /// Post the semaphore from task context, releasing one waiter if any.
    pub fn post(&self) -> Result<()> {
        to_result_void(k_sem_give(self.item))
    }

    /// Post the semaphore from an interrupt handler.
    pub fn post_from_isr(&self) -> Result<()> {
        let lock = KernelLock::acquire_from_isr();
        self.give_i(&lock)
    }

    /// Reset the count to the capacity.
    ///
    /// Any task blocked in [`wait`](Self::wait) is released with [`Error::Reset`], which callers
    /// must not mistake for a signal.  Used to abort outstanding work during error recovery.
    ///
    /// [`Error::Reset`]: crate::Error::Reset
    pub fn reset(&self) {
        debug!("semaphore reset to {}", self.capacity);
        k_sem_reset(self.item, self.capacity)
    }

    /// The current count.
    pub fn count(&self) -> u32 {
        let lock = KernelLock::acquire_any();
        self.count_i(&lock)
    }

    /// The count given at creation and restored by reset.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub(crate) fn take_i(&self, _lock: &KernelLock) -> Result<()> {
        to_result_void(unsafe { k_sem_take_i(self.item) })
    }

    pub(crate) fn give_i(&self, _lock: &KernelLock) -> Result<()> {
        to_result_void(unsafe { k_sem_give_i(self.item) })
    }

    pub(crate) fn count_i(&self, _lock: &KernelLock) -> u32 {
        unsafe { k_sem_count_get_i(self.item) }
    }
}

/// Static storage of a semaphore: the capacity and the kernel `k_sem`.
pub struct SemaphoreDef {
    capacity: u32,
    sem: k_sem,
}

/// A static kernel semaphore.
///
/// This is intended to be used from within the `kobj_define!` macro.  Call [`init_once`] to get
/// the [`Semaphore`] it represents.
///
/// [`init_once`]: StaticKernelObject::init_once
pub type StaticSemaphore = StaticKernelObject<SemaphoreDef>;

impl StaticSemaphore {
    /// Semaphore storage that will be created holding `capacity` permits.
    pub const fn new(capacity: u32) -> StaticSemaphore {
        StaticKernelObject::with_value(SemaphoreDef {
            capacity,
            sem: <k_sem as RawSemaphore>::UNINIT,
        })
    }

    /// The capacity this semaphore is declared with.
    pub const fn capacity(&self) -> u32 {
        self.value.capacity
    }
}

impl<'a> Wrapped<'a> for StaticSemaphore {
    type Handle = Semaphore<'a>;

    /// Semaphores take their initial count from the declaration.
    type Args = ();

    fn get_wrapped(&'a self, _args: ()) -> Semaphore<'a> {
        let def = &self.value;
        k_sem_init(&def.sem, def.capacity, K_SEM_MAX_LIMIT);
        trace!("semaphore created, capacity {}", def.capacity);
        Semaphore::from_raw(&def.sem, def.capacity)
    }
}

impl fmt::Debug for Semaphore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::Semaphore {:p} (capacity {})", self.item, self.capacity)
    }
}
