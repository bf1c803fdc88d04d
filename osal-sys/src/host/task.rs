// SPDX-License-Identifier: Apache-2.0

//! Host tasks and their priorities.

use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use std::cell::RefCell;
use std::io;
use std::string::String;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::vec::Vec;

use log::trace;

/// Task priority.  Larger values are more urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u8);

impl Priority {
    /// Lowest priority.
    pub const LOWEST: Priority = Priority(1);
    /// Background work.
    pub const LOW: Priority = Priority(64);
    /// Default priority of a task.
    pub const NORMAL: Priority = Priority(128);
    /// Urgent work.
    pub const HIGH: Priority = Priority(192);
    /// Highest priority.
    pub const HIGHEST: Priority = Priority(255);
}

/// A priority raised on a task because `waiter` is blocked on a mutex it holds.
#[derive(Debug)]
struct Boost {
    mutex: usize,
    waiter: usize,
    priority: Priority,
}

#[derive(Debug)]
struct Task {
    id: usize,
    name: Option<String>,
    base: AtomicU8,
    effective: AtomicU8,
    boosts: Mutex<Vec<Boost>>,
}

/// A reference to a host task.
#[derive(Clone)]
pub struct TaskRef(Arc<Task>);

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

std::thread_local! {
    static CURRENT: RefCell<Option<TaskRef>> = const { RefCell::new(None) };
}

impl TaskRef {
    fn new(name: Option<String>, priority: Priority) -> TaskRef {
        TaskRef(Arc::new(Task {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
            base: AtomicU8::new(priority.0),
            effective: AtomicU8::new(priority.0),
            boosts: Mutex::new(Vec::new()),
        }))
    }

    /// Unique id of the task.
    pub fn id(&self) -> usize {
        self.0.id
    }

    /// Name given at spawn, or the thread name.
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// The priority the task currently runs at, including any inherited priority.
    pub fn priority(&self) -> Priority {
        Priority(self.0.effective.load(Ordering::Relaxed))
    }

    /// The priority the task was given.
    pub fn base_priority(&self) -> Priority {
        Priority(self.0.base.load(Ordering::Relaxed))
    }

    /// Change the base priority.  Inherited priority still applies on top.
    pub fn set_priority(&self, priority: Priority) {
        super::with_kernel(|| {
            self.0.base.store(priority.0, Ordering::Relaxed);
            self.recompute();
        })
    }

    // The boost calls are made with the kernel lock held.

    pub(crate) fn add_boost(&self, mutex: usize, waiter: &TaskRef) {
        self.boosts().push(Boost {
            mutex,
            waiter: waiter.id(),
            priority: waiter.priority(),
        });
        self.recompute();
    }

    pub(crate) fn remove_boost(&self, mutex: usize, waiter: usize) {
        self.boosts()
            .retain(|b| !(b.mutex == mutex && b.waiter == waiter));
        self.recompute();
    }

    pub(crate) fn clear_boosts(&self, mutex: usize) {
        self.boosts().retain(|b| b.mutex != mutex);
        self.recompute();
    }

    fn boosts(&self) -> std::sync::MutexGuard<'_, Vec<Boost>> {
        self.0.boosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recompute(&self) {
        let base = self.base_priority();
        let inherited = self.boosts().iter().map(|b| b.priority).max();
        let effective = inherited.map_or(base, |p| p.max(base));
        self.0.effective.store(effective.0, Ordering::Relaxed);
    }
}

impl PartialEq for TaskRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TaskRef {}

impl fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {}", self.0.id)?;
        if let Some(name) = self.name() {
            write!(f, " ({})", name)?;
        }
        write!(f, " prio {}", self.priority().0)
    }
}

/// The calling task.
///
/// Threads that were not started with [`spawn`] are registered on first use, at
/// [`Priority::NORMAL`].
pub fn current() -> TaskRef {
    CURRENT.with(|current| {
        current
            .borrow_mut()
            .get_or_insert_with(|| {
                let name = thread::current().name().map(String::from);
                TaskRef::new(name, Priority::NORMAL)
            })
            .clone()
    })
}

/// Start a new task running `f` at `priority`.
pub fn spawn<F, T>(name: &str, priority: Priority, f: F) -> io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let task = TaskRef::new(Some(String::from(name)), priority);
    trace!("spawn {:?}", task);
    thread::Builder::new()
        .name(String::from(name))
        .spawn(move || {
            CURRENT.with(|current| *current.borrow_mut() = Some(task));
            f()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_stable() {
        let a = current();
        let b = current();
        assert_eq!(a, b);
        assert_eq!(a.priority(), Priority::NORMAL);
    }

    #[test]
    fn spawned_task_has_priority() {
        let handle = spawn("prio", Priority::HIGH, || {
            let me = current();
            (me.priority(), me.name().map(String::from))
        })
        .unwrap();
        let (priority, name) = handle.join().unwrap();
        assert_eq!(priority, Priority::HIGH);
        assert_eq!(name.as_deref(), Some("prio"));
    }

    #[test]
    fn boosts_raise_and_restore() {
        let holder = TaskRef::new(None, Priority::LOW);
        let waiter = TaskRef::new(None, Priority::HIGH);
        holder.add_boost(1, &waiter);
        assert_eq!(holder.priority(), Priority::HIGH);
        assert_eq!(holder.base_priority(), Priority::LOW);
        holder.remove_boost(1, waiter.id());
        assert_eq!(holder.priority(), Priority::LOW);
    }

    #[test]
    fn clearing_one_mutex_keeps_others() {
        let holder = TaskRef::new(None, Priority::LOW);
        let normal = TaskRef::new(None, Priority::NORMAL);
        let high = TaskRef::new(None, Priority::HIGH);
        holder.add_boost(1, &high);
        holder.add_boost(2, &normal);
        holder.clear_boosts(1);
        assert_eq!(holder.priority(), Priority::NORMAL);
        holder.clear_boosts(2);
        assert_eq!(holder.priority(), Priority::LOW);
    }
}
