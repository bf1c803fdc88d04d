// SPDX-License-Identifier: Apache-2.0

//! Semaphore based sync.
//!
//! This is the simplest type of sync, which uses a single semaphore per fork.

use std::sync::Arc;

use osal::sys::sync::Semaphore;
use osal::time::Forever;
use osal::kobj_define;

use crate::{ForkSync, NUM_PHIL};

#[derive(Debug)]
pub struct SemSync {
    /// The forks for this philosopher.  This is a bit excessive, as we really don't need all of
    /// them, but the ForkSync code uses the index here.
    forks: [Semaphore<'static>; NUM_PHIL],
}

impl ForkSync for SemSync {
    fn take(&self, index: usize) {
        self.forks[index].wait(Forever).unwrap();
    }

    fn release(&self, index: usize) {
        self.forks[index].post().unwrap();
    }
}

pub fn semaphore_sync() -> Vec<Arc<dyn ForkSync>> {
    // Each fork starts on the table.
    let forks = SEMS.each_ref().map(|m| m.init_once(()).unwrap());

    (0..NUM_PHIL)
        .map(|_| Arc::new(SemSync { forks }) as Arc<dyn ForkSync>)
        .collect()
}

kobj_define! {
    static SEMS: [StaticSemaphore(1); NUM_PHIL];
}
