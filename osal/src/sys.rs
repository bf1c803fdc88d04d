// SPDX-License-Identifier: Apache-2.0

//! OSAL 'sys' module.
//!
//! The `osal-sys` crate contains the raw bindings to the selected kernel.  Several of them are
//! unsafe, as they must be called with the kernel lock held.
//!
//! This module `osal::sys` contains thin wrappers to these bindings, that can be used without
//! unsafe, but as unchanged as possible.

pub mod queue;
pub mod sync;

/// Represents a timeout with an infinite delay.
///
/// Low-level kernel constant.  Calls using this value will wait as long as necessary to perform
/// the requested operation.
pub use crate::raw::K_FOREVER;

/// Represents a null timeout delay.
///
/// Low-level kernel constant.  Calls using this value will not wait if the operation cannot be
/// performed immediately.
pub use crate::raw::K_NO_WAIT;

/// Return the current uptime of the system in ms.
///
/// Precision is limited by the system tick timer.
#[inline]
pub fn uptime_get() -> i64 {
    let ticks = crate::raw::k_uptime_ticks();
    (ticks * 1000 / crate::time::SYS_FREQUENCY as u64) as i64
}

pub mod critical {
    //! Kernel lock and critical sections.
    //!
    //! [`KernelLock`] holds the kernel lock for as long as it lives.  The I-class operations of the
    //! primitives take a reference to one as proof that the lock is held, and this is how the ISR
    //! paths bracket every pool and FIFO update.
    //!
    //! When `CONFIG_OSAL_CRITICAL_SECTION` is set, this also provides the implementation behind the
    //! `critical-section` crate, for external crates that want this interface.

    use core::marker::PhantomData;

    use crate::raw::{k_is_in_isr, k_lock, k_lock_from_isr, k_unlock, k_unlock_from_isr, LockKey};

    /// The kernel lock, released on drop.
    ///
    /// Nothing may block while it is held.  The guard stays on the task or ISR that took it.
    pub struct KernelLock {
        key: LockKey,
        isr: bool,
        _nosend: PhantomData<*mut ()>,
    }

    impl KernelLock {
        /// Take the kernel lock from task context.
        pub fn acquire() -> KernelLock {
            KernelLock {
                key: k_lock(),
                isr: false,
                _nosend: PhantomData,
            }
        }

        /// Take the kernel lock from ISR context.
        pub fn acquire_from_isr() -> KernelLock {
            KernelLock {
                key: k_lock_from_isr(),
                isr: true,
                _nosend: PhantomData,
            }
        }

        /// Take the kernel lock with the flavour matching the current context.
        pub fn acquire_any() -> KernelLock {
            if k_is_in_isr() {
                KernelLock::acquire_from_isr()
            } else {
                KernelLock::acquire()
            }
        }
    }

    impl Drop for KernelLock {
        fn drop(&mut self) {
            // The key came from the matching acquire, and guards drop in reverse order.
            unsafe {
                if self.isr {
                    k_unlock_from_isr(self.key);
                } else {
                    k_unlock(self.key);
                }
            }
        }
    }

    #[cfg(CONFIG_OSAL_CRITICAL_SECTION)]
    mod imp {
        use critical_section::RawRestoreState;

        use crate::raw::{k_is_in_isr, k_lock, k_lock_from_isr, k_unlock, k_unlock_from_isr, LockKey};

        struct OsalCriticalSection;
        critical_section::set_impl!(OsalCriticalSection);

        // The context cannot change between acquire and release, so it picks the flavour for both.
        unsafe impl critical_section::Impl for OsalCriticalSection {
            unsafe fn acquire() -> RawRestoreState {
                let key = if k_is_in_isr() {
                    k_lock_from_isr()
                } else {
                    k_lock()
                };
                key.0
            }

            unsafe fn release(token: RawRestoreState) {
                if k_is_in_isr() {
                    k_unlock_from_isr(LockKey(token));
                } else {
                    k_unlock(LockKey(token));
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn lock_nests() {
            let outer = KernelLock::acquire_any();
            let inner = KernelLock::acquire();
            drop(inner);
            drop(outer);
        }

        #[cfg(CONFIG_OSAL_CRITICAL_SECTION)]
        #[test]
        fn critical_section_uses_kernel_lock() {
            let value = critical_section::Mutex::new(core::cell::Cell::new(1));
            critical_section::with(|cs| {
                let _nested = KernelLock::acquire();
                value.borrow(cs).set(2);
            });
            assert_eq!(critical_section::with(|cs| value.borrow(cs).get()), 2);
        }
    }
}
