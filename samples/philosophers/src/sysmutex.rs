// SPDX-License-Identifier: Apache-2.0

//! # sys::Mutex implementation of ForkSync
//!
//! This is a simple implementation of the Fork synchronizer that uses the kernel's `k_mutex`
//! wrapped in `sys::Mutex`.  The ForkSync semantics map simply to these.  A philosopher waiting
//! for a fork lends its priority to the one eating with it.

use std::sync::Arc;

use osal::kobj_define;
use osal::sys::sync::Mutex;
use osal::time::Forever;

use crate::{ForkSync, NUM_PHIL};

type SysMutexes = [Mutex<'static>; NUM_PHIL];

/// A simple implementation of ForkSync based on the kernel sys::Mutex, which uses explicit lock
/// and release semantics.
#[derive(Debug)]
pub struct SysMutexSync {
    locks: SysMutexes,
}

impl ForkSync for SysMutexSync {
    fn take(&self, index: usize) {
        self.locks[index].lock(Forever).unwrap();
    }

    fn release(&self, index: usize) {
        self.locks[index].unlock().unwrap();
    }
}

pub fn sys_mutex_sync() -> Vec<Arc<dyn ForkSync>> {
    let locks = MUTEXES.each_ref().map(|m| m.init_once(()).unwrap());
    let syncer: Arc<dyn ForkSync> = Arc::new(SysMutexSync { locks });
    (0..NUM_PHIL).map(|_| syncer.clone()).collect()
}

kobj_define! {
    static MUTEXES: [StaticMutex; NUM_PHIL];
}
