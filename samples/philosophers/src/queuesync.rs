// SPDX-License-Identifier: Apache-2.0

//! Synchronizer using a queue
//!
//! The philosophers send their requests through a pool-backed queue to a server task that owns the
//! forks.  The server answers a philosopher by posting that philosopher's reply semaphore.  The
//! request queue holds a single record, so senders regularly block on it.

use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

use osal::kobj_define;
use osal::raw::host::{spawn, Priority};
use osal::sys::queue::Queue;
use osal::sys::sync::Semaphore;
use osal::time::Forever;

use crate::{ForkSync, NUM_PHIL};

#[derive(Clone, Copy, Debug)]
enum Command {
    Acquire { fork: usize, phil: usize },
    Release(usize),
    Stop,
}

/// This implements a single Fork on the server side.
#[derive(Clone, Copy, Default)]
enum QueueFork {
    /// The fork is free,
    #[default]
    Free,
    /// The fork is in use, nobody is waiting.
    InUse,
    /// The fork is in use, and this philosopher is waiting on it.
    InUseWait(usize),
}

/// An implementation of ForkSync that uses a server fed through a queue to perform the
/// synchronization.
#[derive(Debug)]
struct QueueSync {
    phil: usize,
    command: Queue<'static, Command>,
    reply: Semaphore<'static>,
}

impl ForkSync for QueueSync {
    fn take(&self, index: usize) {
        self.command
            .send(&Command::Acquire {
                fork: index,
                phil: self.phil,
            })
            .unwrap();
        self.reply.wait(Forever).unwrap();
    }

    fn release(&self, index: usize) {
        self.command.send(&Command::Release(index)).unwrap();
    }
}

static SERVER: OnceLock<(Queue<'static, Command>, JoinHandle<()>)> = OnceLock::new();

/// Start the fork server, and generate a syncer for each philosopher.
pub fn get_queue_syncer() -> Vec<Arc<dyn ForkSync>> {
    let command = COMMANDS.init_once(()).unwrap();
    let replies = REPLIES.each_ref().map(|r| r.init_once(()).unwrap());

    let server = spawn("fork server", Priority::HIGH, move || {
        fork_server(command, replies)
    })
    .unwrap();
    let _ = SERVER.set((command, server));

    (0..NUM_PHIL)
        .map(|phil| {
            Arc::new(QueueSync {
                phil,
                command,
                reply: replies[phil],
            }) as Arc<dyn ForkSync>
        })
        .collect()
}

/// Stop the fork server, if it was started.
pub fn stop_server() {
    if let Some((command, server)) = SERVER.get() {
        command.send(&Command::Stop).unwrap();
        while !server.is_finished() {
            osal::time::delay_ms(1);
        }
    }
}

/// The task that handles the requests.
fn fork_server(command: Queue<'static, Command>, replies: [Semaphore<'static>; NUM_PHIL]) {
    let mut forks = [QueueFork::default(); NUM_PHIL];

    loop {
        match command.receive().unwrap() {
            Command::Acquire { fork, phil } => {
                forks[fork] = match forks[fork] {
                    QueueFork::Free => {
                        replies[phil].post().unwrap();
                        QueueFork::InUse
                    }
                    QueueFork::InUse => QueueFork::InUseWait(phil),
                    QueueFork::InUseWait(_) => panic!("Multiple waiters on fork {}", fork),
                };
            }
            Command::Release(fork) => {
                forks[fork] = match forks[fork] {
                    QueueFork::Free => panic!("Release of fork {} that is not in use", fork),
                    QueueFork::InUse => QueueFork::Free,
                    QueueFork::InUseWait(waiter) => {
                        replies[waiter].post().unwrap();
                        QueueFork::InUse
                    }
                };
            }
            Command::Stop => break,
        }
    }
}

kobj_define! {
    static COMMANDS: StaticQueue<Command, 1>;
    static REPLIES: [StaticSemaphore(0); NUM_PHIL];
}
