// SPDX-License-Identifier: Apache-2.0

//! # Low-level synchronization primitives.
//!
//! Thin safe wrappers around the kernel's semaphore and mutex objects.  Both are declared
//! statically (see [`kobj_define!`]), created once with `init_once`, and used through a `Copy`
//! handle borrowing that storage.  The other module `crate::sync` provides a higher level mutex
//! that protects data in coordination with Rust's borrowing rules.
//!
//! The mutex is its own type, not a semaphore with one permit: its operations go to the kernel's
//! priority-inheriting mutex.
//!
//! [`kobj_define!`]: crate::kobj_define

pub mod mutex;
pub mod semaphore;

pub use mutex::{Mutex, MutexDef, StaticMutex};
pub use semaphore::{Semaphore, SemaphoreDef, StaticSemaphore};
