// SPDX-License-Identifier: Apache-2.0

//! Portable synchronization for device drivers.
//!
//! This crate lets a driver stack block, signal, and exchange fixed-size messages between task
//! and interrupt context with the same semantics on every supported kernel.  The primitives are:
//!
//! - [`sys::sync::Semaphore`]: counting semaphore with a task and an ISR post path.
//! - [`sys::sync::Mutex`]: mutex routed through the kernel's priority-inheriting primitive.
//! - [`sys::queue::Queue`]: bounded FIFO of fixed-size records backed by a preallocated pool.
//! - [`time::sleep`]: task delay.
//!
//! All storage is declared statically (see [`kobj_define!`]), created once with `init_once`, and
//! then used through small `Copy` handles that borrow the storage.  Nothing here allocates.
//!
//! Which kernel backs these primitives is chosen at build time in `osal-sys`.

#![cfg_attr(not(test), no_std)]
// Cfgs come from the Kconfig-style configuration file, which cargo cannot know about.
#![allow(unexpected_cfgs)]
#![deny(missing_docs)]

pub mod error;
pub mod logging;
pub mod object;
pub mod sync;
pub mod sys;
pub mod time;

pub use error::{Error, Result};

pub use logging::set_logger;

// Bring in the generated kconfig module
pub mod kconfig {
    //! OSAL configuration values.
    //!
    //! This module contains an auto-generated set of constants corresponding to the numeric and
    //! string values in the configuration file used for the build.

    #![allow(missing_docs)]

    include!(concat!(env!("OUT_DIR"), "/kconfig.rs"));
}

// Printk is provided if it is configured into the build.
#[cfg(CONFIG_PRINTK)]
pub mod printk;

/// Re-export of osal-sys as `osal::raw`.
pub mod raw {
    pub use osal_sys::*;
}
