// SPDX-License-Identifier: Apache-2.0

//! Higher level Mutex type and friends.
//!
//! These are modeled after the synchronization primitives in
//! [`std::sync`](https://doc.rust-lang.org/stable/std/sync/index.html), notably `Mutex`, and the
//! associated types.

use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use log::debug;

use crate::error::Error;
use crate::sys::sync as sys;
use crate::time::{Forever, NoWait, Timeout};

/// There is no poisoning.  A lock fails only when the kernel refuses it, for example on a timeout
/// or a recursive lock.
pub type LockResult<Guard> = Result<Guard, Error>;

/// The return type from [`Mutex::try_lock`].
pub type TryLockResult<Guard> = Result<Guard, TryLockError>;

/// An enumeration of possible errors associated with a [`TryLockResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TryLockError {
    /// The lock could not be acquired at this time because the operation would otherwise block.
    WouldBlock,
    /// The kernel refused the lock, for example because this task already holds it.
    Refused(Error),
}

/// A mutual exclusion primitive useful for protecting shared data.
///
/// This mutex will block tasks waiting for the lock to become available.  It is modeled after
/// [`std::sync::Mutex`](https://doc.rust-lang.org/stable/std/sync/struct.Mutex.html), with these
/// differences:
/// - Poisoning: there is none.
/// - Allocation: there is no `new`.  Use [`new_from`](Mutex::new_from), which takes a
///   [`sys::Mutex`](crate::sys::sync::Mutex) handle to a statically declared kernel mutex.  The
///   lock inherits that mutex's priority inheritance.
pub struct Mutex<'m, T: ?Sized> {
    inner: sys::Mutex<'m>,
    data: UnsafeCell<T>,
}

// At least if correctly done, the Mutex provides for Send and Sync as long as the inner data
// supports Send.
unsafe impl<T: ?Sized + Send> Send for Mutex<'_, T> {}
unsafe impl<T: ?Sized + Send> Sync for Mutex<'_, T> {}

impl<T: ?Sized> fmt::Debug for Mutex<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutex {:?}", self.inner)
    }
}

/// An RAII implementation of a "scoped lock" of a mutex.  When this structure is dropped (falls
/// out of scope), the lock will be unlocked.
///
/// The data protected by the mutex can be accessed through this guard via its [`Deref`] and
/// [`DerefMut`] implementations.
///
/// This structure is created by the [`lock`], [`lock_timeout`] and [`try_lock`] methods on
/// [`Mutex`].
///
/// [`lock`]: Mutex::lock
/// [`lock_timeout`]: Mutex::lock_timeout
/// [`try_lock`]: Mutex::try_lock
pub struct MutexGuard<'a, T: ?Sized + 'a> {
    lock: &'a Mutex<'a, T>,
    // Only the task that locked the kernel mutex can unlock it, so the guard must not be sent.
    _nosend: PhantomData<*mut ()>,
}

unsafe impl<T: ?Sized + Sync> Sync for MutexGuard<'_, T> {}

impl<'m, T> Mutex<'m, T> {
    /// Construct a new wrapped Mutex, using the given underlying sys mutex.  This is different
    /// from `std::sync::Mutex` in that kernel objects are allocated statically, and the sys Mutex
    /// handle will be taken by this structure.  It is safe to share the underlying Mutex between
    /// different items, but without careful use, it is easy to deadlock, so it is not recommended.
    pub const fn new_from(t: T, raw_mutex: sys::Mutex<'m>) -> Mutex<'m, T> {
        Mutex {
            inner: raw_mutex,
            data: UnsafeCell::new(t),
        }
    }

    /// Consumes this mutex, returning the underlying data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<'m, T: ?Sized> Mutex<'m, T> {
    /// Acquires a mutex, blocking the current task until it is able to do so.
    ///
    /// Upon returning, the task is the only task with the lock held.  An RAII guard is returned
    /// to allow scoped unlock of the lock.  When the guard goes out of scope, the mutex will be
    /// unlocked.
    ///
    /// Locking a mutex the task already holds fails with [`Error::Misuse`].
    pub fn lock(&self) -> LockResult<MutexGuard<'_, T>> {
        self.lock_timeout(Forever)
    }

    /// Acquires a mutex, waiting at most `timeout`.
    pub fn lock_timeout<D>(&self, timeout: D) -> LockResult<MutexGuard<'_, T>>
    where
        D: Into<Timeout>,
    {
        self.inner.lock(timeout)?;
        Ok(MutexGuard::new(self))
    }

    /// Attempts to acquire this lock.
    ///
    /// If the lock could not be acquired at this time, then [`Err`] is returned. Otherwise, an RAII
    /// guard is returned. The lock will be unlocked when the guard is dropped.
    ///
    /// This function does not block.
    pub fn try_lock(&self) -> TryLockResult<MutexGuard<'_, T>> {
        match self.inner.lock(NoWait) {
            Ok(()) => Ok(MutexGuard::new(self)),
            Err(Error::Timeout) => Err(TryLockError::WouldBlock),
            Err(err) => Err(TryLockError::Refused(err)),
        }
    }

    /// Returns a mutable reference to the underlying data.
    ///
    /// No locking is needed, as the mutable borrow guarantees there are no other users.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<'a, T: ?Sized> MutexGuard<'a, T> {
    fn new(lock: &'a Mutex<'a, T>) -> MutexGuard<'a, T> {
        MutexGuard {
            lock,
            _nosend: PhantomData,
        }
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // The guard is only built after a successful lock on this task.
        if let Err(err) = self.lock.inner.unlock() {
            debug!("mutex guard unlock: {}", err);
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::sync::StaticMutex;

    #[test]
    fn guard_unlocks() {
        static LOCK: StaticMutex = StaticMutex::new();
        let counter = Mutex::new_from(0u32, LOCK.init_once(()).unwrap());
        {
            let mut guard = counter.lock().unwrap();
            *guard += 1;
            assert_eq!(counter.lock_timeout(NoWait).err(), Some(Error::Misuse));
            assert_eq!(counter.try_lock().err(), Some(TryLockError::Refused(Error::Misuse)));
        }
        *counter.try_lock().unwrap() += 1;
        assert_eq!(counter.into_inner(), 2);
    }

    #[test]
    fn contended_try_lock_would_block() {
        static LOCK: StaticMutex = StaticMutex::new();
        let shared = Mutex::new_from((), LOCK.init_once(()).unwrap());
        let guard = shared.lock().unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(shared.try_lock().err(), Some(TryLockError::WouldBlock));
            });
        });
        drop(guard);
    }
}
