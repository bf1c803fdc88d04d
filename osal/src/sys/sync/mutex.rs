// SPDX-License-Identifier: Apache-2.0

//! Kernel `k_mutex` wrapper.
//!
//! The mutex holds one permit, like a semaphore created with capacity one, but it is a distinct
//! kernel object: the kernel knows who holds it and applies priority inheritance.  While a task is
//! blocked in [`Mutex::lock`], the holder runs at no lower than the waiter's priority until it
//! unlocks.
//!
//! Locking and unlocking are task-context only, and only the holder may unlock.

use core::fmt;

use log::trace;

use crate::{
    error::{to_result_void, Result},
    object::{StaticKernelObject, Wrapped},
    raw::{k_mutex, k_mutex_init, k_mutex_lock, k_mutex_unlock, RawMutex},
    time::Timeout,
};

/// A kernel mutex usable from safe Rust code.
///
/// This merely wraps a reference to the kernel object.  It is `Copy`, as it is fine to have
/// several handles to the same mutex and use them from several tasks.
///
/// Note that these are safe in the sense that memory safety is guaranteed.  Recursive locking is
/// refused with [`Error::Misuse`], but incorrect nesting of several mutexes can easily deadlock.
///
/// For a mutex that protects data, see [`sync::Mutex`].
///
/// [`Error::Misuse`]: crate::Error::Misuse
/// [`sync::Mutex`]: crate::sync::Mutex
#[derive(Clone, Copy)]
pub struct Mutex<'a> {
    item: &'a k_mutex,
}

impl Mutex<'_> {
    /// Lock the mutex.
    ///
    /// Waits at most `timeout` for the lock.  `Ok(())` means the lock has been acquired, and
    /// [`Error::Timeout`] that the wait expired.
    ///
    /// [`Error::Timeout`]: crate::Error::Timeout
    pub fn lock<T>(&self, timeout: T) -> Result<()>
    where
        T: Into<Timeout>,
    {
        let timeout: Timeout = timeout.into();
        to_result_void(k_mutex_lock(self.item, timeout.0))
    }

    /// Unlock the mutex.
    ///
    /// The mutex must be held by the calling task, otherwise this fails with
    /// [`Error::NotOwner`].  If tasks are waiting, the lock passes to the most urgent of them.
    ///
    /// [`Error::NotOwner`]: crate::Error::NotOwner
    pub fn unlock(&self) -> Result<()> {
        to_result_void(k_mutex_unlock(self.item))
    }
}

/// Static storage of a mutex.
pub struct MutexDef {
    mutex: k_mutex,
}

/// A static kernel `k_mutex`.
///
/// This is intended to be used from within the `kobj_define!` macro.  Call [`init_once`] to get
/// the [`Mutex`] that it represents.
///
/// [`init_once`]: StaticKernelObject::init_once
pub type StaticMutex = StaticKernelObject<MutexDef>;

impl StaticMutex {
    /// Mutex storage, unlocked once created.
    pub const fn new() -> StaticMutex {
        StaticKernelObject::with_value(MutexDef {
            mutex: <k_mutex as RawMutex>::UNINIT,
        })
    }
}

impl<'a> Wrapped<'a> for StaticMutex {
    type Handle = Mutex<'a>;

    /// Mutex initializers take no argument.
    type Args = ();

    fn get_wrapped(&'a self, _args: ()) -> Mutex<'a> {
        let mutex = &self.value.mutex;
        k_mutex_init(mutex);
        trace!("mutex created");
        Mutex { item: mutex }
    }
}

impl fmt::Debug for Mutex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys::Mutex {:p}", self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Forever, NoWait};
    use crate::Error;

    #[test]
    fn holder_discipline() {
        static LOCK: StaticMutex = StaticMutex::new();
        let lock = LOCK.init_once(()).unwrap();
        assert_eq!(lock.unlock(), Err(Error::NotOwner));
        lock.lock(Forever).unwrap();
        assert_eq!(lock.lock(NoWait), Err(Error::Misuse));
        lock.unlock().unwrap();
        lock.lock(NoWait).unwrap();
        lock.unlock().unwrap();
    }
}
