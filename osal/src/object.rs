// SPDX-License-Identifier: Apache-2.0

//! # Statically declared kernel objects
//!
//! Every primitive in this crate lives in storage the driver declares at compile time.  The
//! storage is a [`StaticKernelObject`] holding the kernel-native object, and nothing happens to it
//! until [`init_once`] is called.  That call runs the object's creation routine (the [`Wrapped`]
//! implementation) and hands back a handle: a small `Copy` value borrowing the storage.  The
//! borrow is what keeps a handle from outliving its definition.
//!
//! ```
//! use osal::kobj_define;
//!
//! kobj_define! {
//!     static RX_READY: StaticSemaphore(0);
//!     static BUS_LOCK: StaticMutex;
//!     static EVENTS: StaticQueue<u32, 4>;
//! }
//!
//! let rx_ready = RX_READY.init_once(()).unwrap();
//! let events = EVENTS.init_once(()).unwrap();
//! events.send(&42).unwrap();
//! assert_eq!(events.receive(), Ok(42));
//! # let _ = (rx_ready, BUS_LOCK.init_once(()));
//! ```
//!
//! [`init_once`]: StaticKernelObject::init_once

use crate::sync::atomic::{AtomicUsize, Ordering};

/// Storage has not been created yet.
pub const KOBJ_UNINITIALIZED: usize = 0;

/// Creation is in progress.
pub const KOBJ_INITING: usize = 1;

/// The object has been created and its handle given out.
pub const KOBJ_INITIALIZED: usize = 2;

/// A kernel object in static storage.
///
/// `T` is the definition: the kernel-native object plus whatever the primitive needs next to it.
/// The type aliases in the primitive modules ([`StaticSemaphore`], [`StaticMutex`],
/// [`StaticQueue`]) are what drivers actually name.
///
/// [`StaticSemaphore`]: crate::sys::sync::StaticSemaphore
/// [`StaticMutex`]: crate::sys::sync::StaticMutex
/// [`StaticQueue`]: crate::sys::queue::StaticQueue
pub struct StaticKernelObject<T> {
    pub(crate) value: T,
    init: AtomicUsize,
}

/// The creation routine of a static kernel object.
pub trait Wrapped<'a> {
    /// The handle returned by creation.
    type Handle;

    /// Creation parameters.
    type Args;

    /// Initialize the kernel object and return its handle.  Called at most once.
    fn get_wrapped(&'a self, args: Self::Args) -> Self::Handle;
}

impl<T> StaticKernelObject<T> {
    pub(crate) const fn with_value(value: T) -> StaticKernelObject<T> {
        StaticKernelObject {
            value,
            init: AtomicUsize::new(KOBJ_UNINITIALIZED),
        }
    }

    /// Create the object and return its handle.
    ///
    /// Returns `None` on every call but the first, so the object is created exactly once even if
    /// two tasks race to do it.  Task context only.
    pub fn init_once<'a>(&'a self, args: <Self as Wrapped<'a>>::Args) -> Option<<Self as Wrapped<'a>>::Handle>
    where
        Self: Wrapped<'a>,
    {
        if self
            .init
            .compare_exchange(
                KOBJ_UNINITIALIZED,
                KOBJ_INITING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return None;
        }
        let result = self.get_wrapped(args);
        self.init.store(KOBJ_INITIALIZED, Ordering::Release);
        Some(result)
    }

    /// Has [`init_once`](Self::init_once) completed?
    pub fn is_initialized(&self) -> bool {
        self.init.load(Ordering::Acquire) == KOBJ_INITIALIZED
    }
}

/// Declare static kernel objects.
///
/// Each entry declares a `static` of one of the storage types, optionally as an array:
///
/// ```text
/// kobj_define! {
///     static SEM: StaticSemaphore(capacity);
///     static SEMS: [StaticSemaphore(capacity); count];
///     static LOCK: StaticMutex;
///     static LOCKS: [StaticMutex; count];
///     static QUEUE: StaticQueue<Record, depth>;
/// }
/// ```
///
/// The queue depth must be a single token: a literal, a constant name, or a `{ block }`.
#[macro_export]
macro_rules! kobj_define {
    () => {};

    ($v:vis static $name:ident: StaticSemaphore($cap:expr); $($rest:tt)*) => {
        $v static $name: $crate::sys::sync::StaticSemaphore =
            $crate::sys::sync::StaticSemaphore::new($cap);
        $crate::kobj_define!($($rest)*);
    };

    ($v:vis static $name:ident: [StaticSemaphore($cap:expr); $size:expr]; $($rest:tt)*) => {
        $v static $name: [$crate::sys::sync::StaticSemaphore; $size] =
            [const { $crate::sys::sync::StaticSemaphore::new($cap) }; $size];
        $crate::kobj_define!($($rest)*);
    };

    ($v:vis static $name:ident: StaticMutex; $($rest:tt)*) => {
        $v static $name: $crate::sys::sync::StaticMutex = $crate::sys::sync::StaticMutex::new();
        $crate::kobj_define!($($rest)*);
    };

    ($v:vis static $name:ident: [StaticMutex; $size:expr]; $($rest:tt)*) => {
        $v static $name: [$crate::sys::sync::StaticMutex; $size] =
            [const { $crate::sys::sync::StaticMutex::new() }; $size];
        $crate::kobj_define!($($rest)*);
    };

    ($v:vis static $name:ident: StaticQueue<$t:ty, $depth:tt>; $($rest:tt)*) => {
        $v static $name: $crate::sys::queue::StaticQueue<$t, $depth> =
            $crate::sys::queue::StaticQueue::<$t, $depth>::new();
        $crate::kobj_define!($($rest)*);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(AtomicUsize);

    impl<'a> Wrapped<'a> for StaticKernelObject<Counter> {
        type Handle = &'a AtomicUsize;
        type Args = usize;

        fn get_wrapped(&'a self, args: usize) -> &'a AtomicUsize {
            self.value.0.fetch_add(args, Ordering::Relaxed);
            &self.value.0
        }
    }

    static COUNTER: StaticKernelObject<Counter> =
        StaticKernelObject::with_value(Counter(AtomicUsize::new(0)));

    #[test]
    fn created_exactly_once() {
        assert!(!COUNTER.is_initialized());
        let handle = COUNTER.init_once(5).unwrap();
        assert!(COUNTER.is_initialized());
        assert!(COUNTER.init_once(7).is_none());
        assert_eq!(handle.load(Ordering::Relaxed), 5);
    }

    crate::kobj_define! {
        static DECLARED_SEMS: [StaticSemaphore(2); 3];
        static DECLARED_LOCKS: [StaticMutex; 2];
        static DECLARED_QUEUE: StaticQueue<[u8; 6], 5>;
    }

    #[test]
    fn declared_storage() {
        assert_eq!(DECLARED_SEMS.len(), 3);
        assert_eq!(DECLARED_SEMS[1].capacity(), 2);
        assert_eq!(DECLARED_LOCKS.len(), 2);
        assert_eq!(crate::sys::queue::StaticQueue::<[u8; 6], 5>::STORAGE_SIZE, 30);
        assert!(!DECLARED_QUEUE.is_initialized());
    }
}
