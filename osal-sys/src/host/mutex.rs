// SPDX-License-Identifier: Apache-2.0

//! Host priority-inheriting mutex.
//!
//! While a task is blocked on a mutex, the holder's effective priority is raised to at least that
//! of the waiter.  On unlock, ownership passes directly to the most urgent waiter, first come first
//! served among equal priorities, and the new holder inherits from the waiters that remain.
//!
//! Inheritance is one level deep: a boosted holder that is itself blocked on another mutex does
//! not pass the boost on.

use core::cmp::Reverse;
use core::ffi::c_int;

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::trace;

use super::task::{current, TaskRef};
use super::{deadline, held, in_isr, kernel, wait_until, with_kernel};
use crate::port::RawMutex;
use crate::{k_timeout_t, neg, EBUSY, EDEADLK, EINVAL, EPERM, ETIMEDOUT, K_NO_WAIT};

#[derive(Debug)]
struct MutexState {
    owner: Option<TaskRef>,
    waiters: VecDeque<TaskRef>,
}

/// Mutex storage for the host kernel.
#[derive(Debug)]
pub struct HostMutex {
    // Only locked with the kernel lock held, so it is never contended.
    state: Mutex<MutexState>,
    cv: Condvar,
}

impl HostMutex {
    fn state(&self) -> MutexGuard<'_, MutexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }
}

unsafe impl RawMutex for HostMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const UNINIT: Self = HostMutex {
        state: Mutex::new(MutexState {
            owner: None,
            waiters: VecDeque::new(),
        }),
        cv: Condvar::new(),
    };

    fn init(&self) {
        with_kernel(|| {
            let mut state = self.state();
            state.owner = None;
            state.waiters.clear();
        })
    }

    fn lock(&self, timeout: k_timeout_t) -> c_int {
        if in_isr() {
            return neg(EINVAL);
        }
        if held() {
            return neg(EDEADLK);
        }

        let me = current();
        let deadline = deadline(timeout);
        let mut guard = kernel();
        {
            let mut state = self.state();
            match &state.owner {
                None => {
                    state.owner = Some(me);
                    return 0;
                }
                Some(owner) if *owner == me => return neg(EDEADLK),
                Some(_) if timeout == K_NO_WAIT => return neg(EBUSY),
                Some(owner) => {
                    owner.add_boost(self.key(), &me);
                    trace!("{:?} blocks on mutex held by {:?}", me, owner);
                    state.waiters.push_back(me.clone());
                }
            }
        }

        loop {
            let timed_out;
            (guard, timed_out) = wait_until(&self.cv, guard, deadline);

            let mut state = self.state();
            if state.owner.as_ref() == Some(&me) {
                return 0;
            }
            if timed_out {
                state.waiters.retain(|w| *w != me);
                if let Some(owner) = &state.owner {
                    owner.remove_boost(self.key(), me.id());
                }
                return neg(ETIMEDOUT);
            }
        }
    }

    fn unlock(&self) -> c_int {
        if in_isr() {
            return neg(EINVAL);
        }

        let me = current();
        with_kernel(|| {
            let mut state = self.state();
            if state.owner.as_ref() != Some(&me) {
                return neg(EPERM);
            }
            me.clear_boosts(self.key());

            let next = state
                .waiters
                .iter()
                .enumerate()
                .max_by_key(|(i, w)| (w.priority(), Reverse(*i)))
                .map(|(i, _)| i);
            let next = next.and_then(|i| state.waiters.remove(i));
            state.owner = next;

            if let Some(owner) = &state.owner {
                for waiter in &state.waiters {
                    owner.add_boost(self.key(), waiter);
                }
                trace!("mutex handed to {:?}", owner);
                self.cv.notify_all();
            }
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::K_FOREVER;

    #[test]
    fn lock_unlock() {
        let mutex = HostMutex::UNINIT;
        mutex.init();
        assert_eq!(mutex.lock(K_FOREVER), 0);
        assert_eq!(mutex.lock(K_NO_WAIT), neg(EDEADLK));
        assert_eq!(mutex.unlock(), 0);
        assert_eq!(mutex.unlock(), neg(EPERM));
    }

    #[test]
    fn not_usable_from_isr() {
        let mutex = HostMutex::UNINIT;
        mutex.init();
        assert_eq!(super::super::isr(|| mutex.lock(K_NO_WAIT)), neg(EINVAL));
        assert_eq!(mutex.lock(K_NO_WAIT), 0);
        assert_eq!(super::super::isr(|| mutex.unlock()), neg(EINVAL));
        assert_eq!(mutex.unlock(), 0);
    }
}
