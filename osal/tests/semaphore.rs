// SPDX-License-Identifier: Apache-2.0

//! Semaphore behavior on the host kernel.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use osal::raw::host::isr;
use osal::time::{Forever, Millis, NoWait};
use osal::{kobj_define, Error};

#[test]
fn wait_succeeds_capacity_times() {
    kobj_define! {
        static SEM: StaticSemaphore(4);
    }
    let sem = SEM.init_once(()).unwrap();
    assert!(SEM.init_once(()).is_none());
    assert_eq!(sem.capacity(), 4);
    for _ in 0..4 {
        sem.wait(Forever).unwrap();
    }
    assert_eq!(sem.wait(NoWait), Err(Error::Timeout));

    let start = Instant::now();
    assert_eq!(sem.wait(Millis(20)), Err(Error::Timeout));
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn post_then_wait_forever() {
    kobj_define! {
        static SEM: StaticSemaphore(0);
    }
    let sem = SEM.init_once(()).unwrap();
    for _ in 0..10 {
        sem.post().unwrap();
        sem.wait(Forever).unwrap();
    }
    assert_eq!(sem.count(), 0);
}

#[test]
fn post_releases_blocked_task() {
    kobj_define! {
        static SEM: StaticSemaphore(0);
    }
    let sem = SEM.init_once(()).unwrap();
    let waiter = thread::spawn(move || sem.wait(Millis(5000)));
    thread::sleep(Duration::from_millis(20));
    sem.post().unwrap();
    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn isr_post_wakes_one_waiter_per_post() {
    kobj_define! {
        static SEM: StaticSemaphore(0);
    }
    let sem = SEM.init_once(()).unwrap();
    let (tx, rx) = mpsc::channel();
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let tx = tx.clone();
            thread::spawn(move || tx.send(sem.wait(Millis(500))).unwrap())
        })
        .collect();
    drop(tx);
    thread::sleep(Duration::from_millis(50));

    // The ISR path returns without waiting for the woken tasks to run.
    let start = Instant::now();
    isr(|| {
        sem.post_from_isr().unwrap();
        sem.post_from_isr().unwrap();
    });
    assert!(start.elapsed() < Duration::from_millis(100));

    for waiter in waiters {
        waiter.join().unwrap();
    }
    let results: Vec<_> = rx.iter().collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(results.iter().filter(|r| **r == Err(Error::Timeout)).count(), 1);
    assert_eq!(sem.count(), 0);
}

#[test]
fn reset_releases_all_waiters() {
    kobj_define! {
        static SEM: StaticSemaphore(2);
    }
    let sem = SEM.init_once(()).unwrap();
    sem.wait(NoWait).unwrap();
    sem.wait(NoWait).unwrap();
    assert_eq!(sem.count(), 0);

    let waiters: Vec<_> = (0..3)
        .map(|_| thread::spawn(move || sem.wait(Forever)))
        .collect();
    thread::sleep(Duration::from_millis(100));
    sem.reset();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Err(Error::Reset));
    }
    assert_eq!(sem.count(), 2);
    sem.wait(NoWait).unwrap();
}

#[test]
fn blocking_wait_is_refused_in_isr() {
    kobj_define! {
        static SEM: StaticSemaphore(0);
    }
    let sem = SEM.init_once(()).unwrap();
    assert_eq!(isr(|| sem.wait(Forever)), Err(Error::Misuse));
    assert_eq!(isr(|| sem.wait(NoWait)), Err(Error::Timeout));
}

#[test]
fn semaphore_arrays() {
    kobj_define! {
        static FORKS: [StaticSemaphore(1); 5];
    }
    let forks: Vec<_> = FORKS.iter().map(|f| f.init_once(()).unwrap()).collect();
    for fork in &forks {
        fork.wait(NoWait).unwrap();
        assert_eq!(fork.wait(NoWait), Err(Error::Timeout));
        fork.post().unwrap();
    }
}
