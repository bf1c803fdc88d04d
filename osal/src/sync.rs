// SPDX-License-Identifier: Apache-2.0

//! Higher level synchronization primitives.
//!
//! These are modeled after the synchronization primitives in
//! [`std::sync`](https://doc.rust-lang.org/stable/std/sync/index.html), in as much as it makes
//! sense for statically allocated kernel objects.

pub mod atomic {
    //! Re-export portable atomic.
    //!
    //! Although `core` contains a
    //! [`sync::atomic`](https://doc.rust-lang.org/stable/core/sync/atomic/index.html) module,
    //! these are dependent on the target having atomic instructions, and the types are missing
    //! when the platform cannot support them.  The [`portable-atomic`] crate either re-exports the
    //! types from core, or provides them on top of a critical section when they aren't available.
    //!
    //! [`portable-atomic`]: https://crates.io/crates/portable-atomic

    pub use portable_atomic::*;
}

mod mutex;

pub use mutex::{LockResult, Mutex, MutexGuard, TryLockError, TryLockResult};
