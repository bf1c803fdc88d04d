// SPDX-License-Identifier: Apache-2.0

//! Mutex behavior on the host kernel, including priority inheritance.

use std::sync::mpsc;
use std::sync::Mutex as StdMutex;
use std::thread;
use std::time::{Duration, Instant};

use osal::raw::host::{current, isr, spawn, Priority, TaskRef};
use osal::sync::Mutex;
use osal::time::{Forever, Millis, NoWait};
use osal::{kobj_define, Error};

/// Poll until `task` runs at `priority`, for at most two seconds.
fn wait_for_priority(task: &TaskRef, priority: Priority) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(2) {
        if task.priority() == priority {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn holder_inherits_waiter_priority() {
    kobj_define! {
        static LOCK: StaticMutex;
        static GO: StaticSemaphore(0);
    }
    let lock = LOCK.init_once(()).unwrap();
    let go = GO.init_once(()).unwrap();

    let (tx, rx) = mpsc::channel();
    let holder = spawn("low", Priority::LOW, move || {
        lock.lock(Forever).unwrap();
        tx.send(current()).unwrap();
        go.wait(Millis(5000)).unwrap();
        lock.unlock().unwrap();
        current().priority()
    })
    .unwrap();
    let holder_task = rx.recv().unwrap();
    assert_eq!(holder_task.priority(), Priority::LOW);

    let waiter = spawn("high", Priority::HIGH, move || {
        let start = Instant::now();
        lock.lock(Forever).unwrap();
        let waited = start.elapsed();
        lock.unlock().unwrap();
        waited
    })
    .unwrap();

    assert!(wait_for_priority(&holder_task, Priority::HIGH));
    assert_eq!(holder_task.base_priority(), Priority::LOW);

    go.post().unwrap();
    assert_eq!(holder.join().unwrap(), Priority::LOW);
    assert!(waiter.join().unwrap() < Duration::from_secs(5));
}

#[test]
fn timed_out_waiter_drops_its_boost() {
    kobj_define! {
        static LOCK: StaticMutex;
        static GO: StaticSemaphore(0);
    }
    let lock = LOCK.init_once(()).unwrap();
    let go = GO.init_once(()).unwrap();

    let (tx, rx) = mpsc::channel();
    let holder = spawn("low", Priority::LOW, move || {
        lock.lock(Forever).unwrap();
        tx.send(current()).unwrap();
        go.wait(Millis(5000)).unwrap();
        lock.unlock()
    })
    .unwrap();
    let holder_task = rx.recv().unwrap();

    // This task runs at the default priority.
    assert_eq!(lock.lock(Millis(30)), Err(Error::Timeout));
    assert_eq!(lock.lock(NoWait), Err(Error::Timeout));
    assert_eq!(holder_task.priority(), Priority::LOW);

    go.post().unwrap();
    assert_eq!(holder.join().unwrap(), Ok(()));
    lock.lock(NoWait).unwrap();
    lock.unlock().unwrap();
}

#[test]
fn unlock_hands_over_to_most_urgent_waiter() {
    kobj_define! {
        static LOCK: StaticMutex;
    }
    let lock = LOCK.init_once(()).unwrap();
    let order = std::sync::Arc::new(StdMutex::new(Vec::new()));

    lock.lock(Forever).unwrap();
    let mut waiters = Vec::new();
    for (name, priority) in [("low", Priority::LOW), ("high", Priority::HIGH)] {
        let order = order.clone();
        waiters.push(
            spawn(name, priority, move || {
                lock.lock(Forever).unwrap();
                order.lock().unwrap().push(name);
                lock.unlock().unwrap();
            })
            .unwrap(),
        );
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(current().priority(), Priority::HIGH);
    lock.unlock().unwrap();
    assert_eq!(current().priority(), Priority::NORMAL);

    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(*order.lock().unwrap(), ["high", "low"]);
}

#[test]
fn only_the_holder_unlocks() {
    kobj_define! {
        static LOCK: StaticMutex;
    }
    let lock = LOCK.init_once(()).unwrap();
    lock.lock(Forever).unwrap();
    let other = thread::spawn(move || lock.unlock());
    assert_eq!(other.join().unwrap(), Err(Error::NotOwner));
    assert_eq!(isr(|| lock.unlock()), Err(Error::Misuse));
    lock.unlock().unwrap();
    assert_eq!(lock.unlock(), Err(Error::NotOwner));
}

#[test]
fn data_mutex_serializes_tasks() {
    kobj_define! {
        static LOCK: StaticMutex;
    }
    let counter = Mutex::new_from(0u32, LOCK.init_once(()).unwrap());
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..250 {
                    let mut guard = counter.lock().unwrap();
                    let value = *guard;
                    thread::yield_now();
                    *guard = value + 1;
                }
            });
        }
    });
    assert_eq!(*counter.lock().unwrap(), 1000);
}
