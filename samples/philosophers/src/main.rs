// SPDX-License-Identifier: Apache-2.0

//! Dining philosophers.
//!
//! The dining philosophers problem is a simple example of cooperation between multiple tasks.
//! This implementation runs the table three times, each time with a different fork synchronizer
//! built on one of the OSAL primitives:
//!
//! - one semaphore per fork,
//! - one priority-inheriting mutex per fork,
//! - a fork server task fed through a pool-backed queue.

use std::sync::Arc;

use log::info;
use osal::raw::host::{spawn, Priority};
use osal::sync::Mutex;
use osal::sys::uptime_get;
use osal::time::{sleep, Duration, Tick};
use osal::{kobj_define, printkln};

mod queuesync;
mod semsync;
mod sysmutex;

/// How many philosophers.  There will be the same number of forks.
const NUM_PHIL: usize = 6;

/// How many times each philosopher eats before leaving the table.
const MEALS: u64 = 20;

/// The philosophers use a fork synchronization mechanism.  Essentially, this is 6 locks, and is
/// implemented in a few different ways to exercise the different primitives.
trait ForkSync: core::fmt::Debug + Sync + Send {
    /// Take the given fork.  The are indexed the same as the philosopher index number.  This will
    /// block until the fork is released.
    fn take(&self, index: usize);

    /// Release the given fork.  Index is the same as take.
    fn release(&self, index: usize);
}

fn main() {
    // The logger can only be installed once, and nothing else runs yet.
    if let Err(err) = unsafe { osal::set_logger() } {
        printkln!("logger not installed: {}", err);
    }
    printkln!("Time tick: {}", osal::time::SYS_FREQUENCY);

    let stats = Arc::new(Mutex::new_from(
        Stats::default(),
        STAT_MUTEX.init_once(()).unwrap(),
    ));

    let runs: [(&str, Vec<Arc<dyn ForkSync>>); 3] = [
        ("semaphore", semsync::semaphore_sync()),
        ("sys mutex", sysmutex::sys_mutex_sync()),
        ("queue", queuesync::get_queue_syncer()),
    ];

    for (name, syncers) in runs {
        printkln!("Table with {} forks", name);
        stats.lock().unwrap().clear();

        let philosophers: Vec<_> = syncers
            .into_iter()
            .enumerate()
            .map(|(i, syncer)| {
                let child_stat = stats.clone();
                // Give the philosophers different priorities so the mutex run exercises
                // priority inheritance.
                let priority = Priority(Priority::LOW.0 + (i as u8) * 16);
                spawn(&format!("phil{}", i), priority, move || {
                    phil_thread(i, syncer, child_stat);
                })
                .unwrap()
            })
            .collect();

        for philosopher in philosophers {
            philosopher.join().unwrap();
        }
        stats.lock().unwrap().show();
    }

    queuesync::stop_server();
    info!("all tables done");
}

fn phil_thread(n: usize, syncer: Arc<dyn ForkSync>, stats: Arc<Mutex<'static, Stats>>) {
    printkln!("Child {} started: {:?}", n, syncer);

    // Determine our two forks.
    let forks = if n == NUM_PHIL - 1 {
        // Per Dijkstra, the last philosopher needs to reverse forks, or we deadlock.
        (0, n)
    } else {
        (n, n + 1)
    };

    for _ in 0..MEALS {
        syncer.take(forks.0);
        syncer.take(forks.1);

        let delay = get_random_delay(n, 2);
        sleep(delay);
        stats.lock().unwrap().record_eat(n, delay);

        // Release the forks.
        syncer.release(forks.1);
        syncer.release(forks.0);

        let delay = get_random_delay(n, 2);
        sleep(delay);
        stats.lock().unwrap().record_think(n, delay);
    }
}

/// Get a random delay, based on the ID of this user, and the current uptime.
fn get_random_delay(id: usize, period: usize) -> Duration {
    let tick = (uptime_get() & (usize::MAX as i64)) as usize;
    let delay = (tick / 10 * (id + 1)) & 0x7;

    // Use one greater to be sure to never get a delay of zero.
    Duration::millis_at_least(((delay + 1) * period) as Tick)
}

/// Instead of just printing out so much information that the data just scrolls by, gather
/// statistics.
#[derive(Default)]
struct Stats {
    /// How many times each philosopher has gone through the loop.
    count: [u64; NUM_PHIL],
    /// How much time each philosopher has spent eating.
    eating: [u64; NUM_PHIL],
    /// How much time each philosopher has spent thinking.
    thinking: [u64; NUM_PHIL],
}

impl Stats {
    fn record_eat(&mut self, index: usize, time: Duration) {
        self.eating[index] += time.to_millis();
    }

    fn record_think(&mut self, index: usize, time: Duration) {
        self.thinking[index] += time.to_millis();
        self.count[index] += 1;
    }

    fn clear(&mut self) {
        *self = Stats::default();
    }

    fn show(&self) {
        printkln!(
            "c:{:?}, e:{:?}, t:{:?}",
            self.count,
            self.eating,
            self.thinking
        );
    }
}

kobj_define! {
    static STAT_MUTEX: StaticMutex;
}
