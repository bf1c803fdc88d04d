// SPDX-License-Identifier: Apache-2.0

//! Bounded queue of fixed-size records, backed by a static object pool.
//!
//! A [`StaticQueue<T, N>`] holds `N` record slots, a free list of slot indices, and a mailbox
//! ring of posted slot indices.  Three counting semaphores track them:
//!
//! - `free`: slots in the pool,
//! - `space`: free entries in the mailbox,
//! - `full`: posted entries waiting to be received.
//!
//! Sending takes a slot from the pool, copies the record into it, and posts the slot index to the
//! mailbox.  Receiving takes the oldest index from the mailbox, copies the record out, and puts
//! the slot back in the pool.  Nothing is allocated after creation, and delivery is FIFO among
//! the records that were successfully sent.
//!
//! The task paths wait (bounded by the timeout) for a slot and then for mailbox space.  If the
//! second wait fails, the slot goes back to the pool before the error is returned.  The ISR path
//! never waits: it takes the slot and the mailbox entry inside the ISR lock, copies the record
//! with the lock released, and reports [`Error::ResourceExhausted`] when the queue is full.
//!
//! ```
//! use osal::kobj_define;
//!
//! kobj_define! {
//!     static SAMPLES: StaticQueue<[u16; 2], 8>;
//! }
//!
//! let samples = SAMPLES.init_once(()).unwrap();
//! assert!(samples.is_empty());
//! samples.send(&[1, 2]).unwrap();
//! assert_eq!(samples.receive(), Ok([1, 2]));
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::mem::{size_of, MaybeUninit};

use log::{debug, trace};

use crate::{
    error::{Error, Result},
    object::{StaticKernelObject, Wrapped},
    raw::{k_sem, k_sem_init, RawSemaphore},
    sync::atomic::{AtomicU16, AtomicUsize, Ordering},
    sys::critical::KernelLock,
    sys::sync::Semaphore,
    time::{Forever, NoWait, Timeout},
};

/// Pool and mailbox bookkeeping of a queue.
///
/// The indices are atomics so that the definition is `Sync`, but they are only touched with the
/// kernel lock held.
pub struct ObjectsFifo {
    free: k_sem,
    space: k_sem,
    full: k_sem,
    free_top: AtomicUsize,
    rd: AtomicUsize,
    wr: AtomicUsize,
}

/// Static storage of a queue of `N` records of type `T`.
pub struct QueueDef<T, const N: usize> {
    objbuf: [UnsafeCell<MaybeUninit<T>>; N],
    freelist: [AtomicU16; N],
    msgbuf: [AtomicU16; N],
    fifo: ObjectsFifo,
}

// A slot is only accessed by the one task or ISR that took it from the free list or the mailbox.
unsafe impl<T: Send, const N: usize> Sync for QueueDef<T, N> {}

/// A statically defined queue.
///
/// This should be declared with `kobj_define!`:
///
/// ```
/// # use osal::kobj_define;
/// kobj_define! {
///     static EVENTS: StaticQueue<u32, 4>;
/// }
///
/// let events = EVENTS.init_once(()).unwrap();
/// events.send(&7).unwrap();
/// ```
pub type StaticQueue<T, const N: usize> = StaticKernelObject<QueueDef<T, N>>;

impl<T: Copy, const N: usize> StaticQueue<T, N> {
    /// Bytes per record.
    pub const RECORD_SIZE: usize = size_of::<T>();

    /// Number of records the queue holds.
    pub const DEPTH: usize = N;

    /// Bytes of record storage, `DEPTH * RECORD_SIZE`.
    pub const STORAGE_SIZE: usize = N * size_of::<T>();

    /// Queue storage.  Created empty by `init_once`.
    pub const fn new() -> StaticQueue<T, N> {
        assert!(N > 0, "a queue needs at least one slot");
        assert!(N <= u16::MAX as usize, "queue depth does not fit a slot index");
        StaticKernelObject::with_value(QueueDef {
            objbuf: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            freelist: [const { AtomicU16::new(0) }; N],
            msgbuf: [const { AtomicU16::new(0) }; N],
            fifo: ObjectsFifo {
                free: <k_sem as RawSemaphore>::UNINIT,
                space: <k_sem as RawSemaphore>::UNINIT,
                full: <k_sem as RawSemaphore>::UNINIT,
                free_top: AtomicUsize::new(0),
                rd: AtomicUsize::new(0),
                wr: AtomicUsize::new(0),
            },
        })
    }
}

impl<'a, T: Copy + 'a, const N: usize> Wrapped<'a> for StaticQueue<T, N> {
    type Handle = Queue<'a, T>;

    type Args = ();

    fn get_wrapped(&'a self, _args: ()) -> Queue<'a, T> {
        let def = &self.value;
        let depth = N as u32;
        k_sem_init(&def.fifo.free, depth, depth);
        k_sem_init(&def.fifo.space, depth, depth);
        k_sem_init(&def.fifo.full, 0, depth);
        {
            let _lock = KernelLock::acquire();
            for (index, slot) in def.freelist.iter().enumerate() {
                slot.store(index as u16, Ordering::Relaxed);
            }
            def.fifo.free_top.store(N, Ordering::Relaxed);
            def.fifo.rd.store(0, Ordering::Relaxed);
            def.fifo.wr.store(0, Ordering::Relaxed);
        }
        trace!("queue created, depth {} record size {}", N, size_of::<T>());
        Queue {
            fifo: &def.fifo,
            objbuf: &def.objbuf,
            freelist: &def.freelist,
            msgbuf: &def.msgbuf,
        }
    }
}

/// A queue handle.
///
/// Returned by [`StaticQueue::init_once`].  It is `Copy` and borrows the definition.
pub struct Queue<'a, T> {
    fifo: &'a ObjectsFifo,
    objbuf: &'a [UnsafeCell<MaybeUninit<T>>],
    freelist: &'a [AtomicU16],
    msgbuf: &'a [AtomicU16],
}

impl<T> Clone for Queue<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Queue<'_, T> {}

// The handle only reaches the storage through the slot protocol above.
unsafe impl<T: Send> Send for Queue<'_, T> {}
unsafe impl<T: Send> Sync for Queue<'_, T> {}

impl<'a, T: Copy> Queue<'a, T> {
    /// Send a record, waiting as long as needed for room.
    pub fn send(&self, item: &T) -> Result<()> {
        self.send_timeout(item, Forever)
    }

    /// Send a record, waiting at most `timeout` for a free slot and again at most `timeout` for
    /// mailbox space.  A sender holding a slot always finds mailbox space, so in practice only
    /// the first wait blocks.
    ///
    /// Task context only.  Returns [`Error::Timeout`] if either wait expires, in which case the
    /// record was not queued and no slot is lost.
    pub fn send_timeout<D>(&self, item: &T, timeout: D) -> Result<()>
    where
        D: Into<Timeout>,
    {
        let timeout: Timeout = timeout.into();

        self.free().wait(timeout)?;
        let slot = self.alloc_slot(&KernelLock::acquire());
        // SAFETY: the slot came off the free list and is ours until it is posted.
        unsafe {
            (*self.objbuf[slot].get()).write(*item);
        }

        if let Err(err) = self.space().wait(timeout) {
            let lock = KernelLock::acquire();
            self.release_slot(slot, &lock);
            self.free().give_i(&lock)?;
            debug!("queue send failed after taking slot {}: {}", slot, err);
            return Err(err);
        }

        let lock = KernelLock::acquire();
        self.post_slot(slot, &lock);
        self.full().give_i(&lock)
    }

    /// Send a record from an interrupt handler.
    ///
    /// Never blocks.  Returns [`Error::ResourceExhausted`] if the queue is full, leaving its
    /// contents untouched.
    pub fn send_from_isr(&self, item: &T) -> Result<()> {
        let slot = {
            let lock = KernelLock::acquire_from_isr();
            if self.free().take_i(&lock).is_err() {
                return Err(Error::ResourceExhausted);
            }
            if self.space().take_i(&lock).is_err() {
                self.free().give_i(&lock)?;
                return Err(Error::ResourceExhausted);
            }
            self.alloc_slot(&lock)
        };

        // The copy runs with interrupts unmasked.
        // SAFETY: the slot came off the free list and is ours until it is posted.
        unsafe {
            (*self.objbuf[slot].get()).write(*item);
        }

        let lock = KernelLock::acquire_from_isr();
        self.post_slot(slot, &lock);
        self.full().give_i(&lock)
    }

    /// Receive the oldest record, waiting as long as needed.
    pub fn receive(&self) -> Result<T> {
        self.receive_timeout(Forever)
    }

    /// Receive the oldest record, waiting at most `timeout` for one to arrive.
    ///
    /// Task context only.  Failures are reported, never retried.
    pub fn receive_timeout<D>(&self, timeout: D) -> Result<T>
    where
        D: Into<Timeout>,
    {
        self.full().wait(timeout)?;
        let slot = {
            let lock = KernelLock::acquire();
            let slot = self.fetch_slot(&lock);
            self.space().give_i(&lock)?;
            slot
        };

        // SAFETY: the slot was posted by a completed send and is ours until it is released.
        let item = unsafe { (*self.objbuf[slot].get()).assume_init_read() };

        let lock = KernelLock::acquire();
        self.release_slot(slot, &lock);
        self.free().give_i(&lock)?;
        Ok(item)
    }

    /// Receive a record if one is queued, without waiting.
    pub fn try_receive(&self) -> Result<T> {
        self.receive_timeout(NoWait)
    }
}

impl<'a, T> Queue<'a, T> {
    /// Are there no records waiting to be received?
    ///
    /// Usable from task and ISR context.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records waiting to be received.
    pub fn len(&self) -> usize {
        let lock = KernelLock::acquire_any();
        self.full().count_i(&lock) as usize
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.objbuf.len()
    }

    /// Bytes per record.
    pub fn record_size(&self) -> usize {
        size_of::<T>()
    }

    fn depth(&self) -> u32 {
        self.objbuf.len() as u32
    }

    fn free(&self) -> Semaphore<'a> {
        Semaphore::from_raw(&self.fifo.free, self.depth())
    }

    fn space(&self) -> Semaphore<'a> {
        Semaphore::from_raw(&self.fifo.space, self.depth())
    }

    fn full(&self) -> Semaphore<'a> {
        Semaphore::from_raw(&self.fifo.full, 0)
    }

    // The slot bookkeeping below runs under the kernel lock.  The semaphores guarantee that the
    // free list is not empty when a slot is taken, and the mailbox is not empty when one is read.

    fn alloc_slot(&self, _lock: &KernelLock) -> usize {
        let top = self.fifo.free_top.load(Ordering::Relaxed) - 1;
        self.fifo.free_top.store(top, Ordering::Relaxed);
        self.freelist[top].load(Ordering::Relaxed) as usize
    }

    fn release_slot(&self, slot: usize, _lock: &KernelLock) {
        let top = self.fifo.free_top.load(Ordering::Relaxed);
        self.freelist[top].store(slot as u16, Ordering::Relaxed);
        self.fifo.free_top.store(top + 1, Ordering::Relaxed);
    }

    fn post_slot(&self, slot: usize, _lock: &KernelLock) {
        let wr = self.fifo.wr.load(Ordering::Relaxed);
        self.msgbuf[wr].store(slot as u16, Ordering::Relaxed);
        self.fifo.wr.store((wr + 1) % self.msgbuf.len(), Ordering::Relaxed);
    }

    fn fetch_slot(&self, _lock: &KernelLock) -> usize {
        let rd = self.fifo.rd.load(Ordering::Relaxed);
        let slot = self.msgbuf[rd].load(Ordering::Relaxed) as usize;
        self.fifo.rd.store((rd + 1) % self.msgbuf.len(), Ordering::Relaxed);
        slot
    }
}

impl<T> fmt::Debug for Queue<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sys::Queue {:p} ({} x {} bytes)",
            self.fifo,
            self.capacity(),
            self.record_size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::host::isr;
    use crate::time::Millis;

    #[test]
    fn declared_sizes() {
        assert_eq!(StaticQueue::<u32, 4>::RECORD_SIZE, 4);
        assert_eq!(StaticQueue::<u32, 4>::DEPTH, 4);
        assert_eq!(StaticQueue::<u32, 4>::STORAGE_SIZE, 16);
        assert_eq!(StaticQueue::<[u8; 3], 7>::STORAGE_SIZE, 21);
    }

    #[test]
    fn slots_are_recycled() {
        static QUEUE: StaticQueue<u8, 2> = StaticQueue::new();
        let queue = QUEUE.init_once(()).unwrap();
        for round in 0..10u8 {
            queue.send(&round).unwrap();
            queue.send(&round.wrapping_add(100)).unwrap();
            assert_eq!(queue.len(), 2);
            assert_eq!(queue.receive(), Ok(round));
            assert_eq!(queue.receive(), Ok(round.wrapping_add(100)));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.free().count(), 2);
        assert_eq!(queue.space().count(), 2);
    }

    #[test]
    fn full_queue() {
        static QUEUE: StaticQueue<u16, 1> = StaticQueue::new();
        let queue = QUEUE.init_once(()).unwrap();
        queue.send(&1).unwrap();
        assert_eq!(queue.send_timeout(&2, Millis(5)), Err(Error::Timeout));
        assert_eq!(queue.send_timeout(&2, NoWait), Err(Error::Timeout));
        assert_eq!(isr(|| queue.send_from_isr(&3)), Err(Error::ResourceExhausted));
        assert_eq!(queue.free().count(), 0);
        assert_eq!(queue.try_receive(), Ok(1));
        assert_eq!(queue.try_receive(), Err(Error::Timeout));
    }

    #[test]
    fn failed_enqueue_returns_slot() {
        static QUEUE: StaticQueue<u32, 2> = StaticQueue::new();
        let queue = QUEUE.init_once(()).unwrap();
        {
            let lock = KernelLock::acquire();
            queue.space().take_i(&lock).unwrap();
            queue.space().take_i(&lock).unwrap();
        }
        assert_eq!(queue.send_timeout(&9, NoWait), Err(Error::Timeout));
        assert_eq!(queue.free().count(), 2);
        assert!(queue.is_empty());

        {
            let lock = KernelLock::acquire();
            queue.space().give_i(&lock).unwrap();
            queue.space().give_i(&lock).unwrap();
        }
        queue.send(&10).unwrap();
        queue.send(&11).unwrap();
        assert_eq!(queue.try_receive(), Ok(10));
        assert_eq!(queue.try_receive(), Ok(11));
    }
}
