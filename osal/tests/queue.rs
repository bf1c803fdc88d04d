// SPDX-License-Identifier: Apache-2.0

//! Pool-backed queue behavior on the host kernel.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use osal::raw::host::isr;
use osal::sys::queue::StaticQueue;
use osal::time::{Forever, Millis, NoWait};
use osal::{kobj_define, Error};

#[test]
fn four_integers_in_order() {
    kobj_define! {
        static QUEUE: StaticQueue<u32, 4>;
    }
    let queue = QUEUE.init_once(()).unwrap();
    assert_eq!(queue.record_size(), 4);
    assert_eq!(queue.capacity(), 4);
    assert!(queue.is_empty());

    for value in [1, 2, 3, 4] {
        queue.send(&value).unwrap();
    }
    assert!(!queue.is_empty());
    assert_eq!(queue.len(), 4);

    let received: Vec<u32> = (0..4).map(|_| queue.receive().unwrap()).collect();
    assert_eq!(received, [1, 2, 3, 4]);
    assert!(queue.is_empty());
}

#[test]
fn isr_send_on_full_queue_fails_without_damage() {
    kobj_define! {
        static QUEUE: StaticQueue<u64, 1>;
    }
    let queue = QUEUE.init_once(()).unwrap();
    queue.send(&0xdead_beef).unwrap();

    assert_eq!(isr(|| queue.send_from_isr(&7)), Err(Error::ResourceExhausted));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.receive(), Ok(0xdead_beef));

    isr(|| queue.send_from_isr(&7)).unwrap();
    assert_eq!(queue.receive(), Ok(7));
    assert!(queue.is_empty());
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Packet {
    endpoint: u8,
    len: u8,
    data: [u8; 14],
}

#[test]
fn records_round_trip_byte_for_byte() {
    const DEPTH: usize = 6;
    kobj_define! {
        static PACKETS: StaticQueue<Packet, DEPTH>;
    }
    assert_eq!(StaticQueue::<Packet, DEPTH>::RECORD_SIZE, 16);
    assert_eq!(StaticQueue::<Packet, DEPTH>::STORAGE_SIZE, DEPTH * 16);

    let packets = PACKETS.init_once(()).unwrap();
    let sent: Vec<Packet> = (0..DEPTH as u8)
        .map(|i| Packet {
            endpoint: i,
            len: i * 2,
            data: [i.wrapping_mul(37); 14],
        })
        .collect();
    for packet in &sent {
        packets.send_timeout(packet, NoWait).unwrap();
    }
    let received: Vec<Packet> = sent.iter().map(|_| packets.try_receive().unwrap()).collect();
    assert_eq!(received, sent);
    assert_eq!(packets.try_receive(), Err(Error::Timeout));
}

#[test]
fn task_send_blocks_until_receive() {
    kobj_define! {
        static QUEUE: StaticQueue<u16, 2>;
    }
    let queue = QUEUE.init_once(()).unwrap();
    queue.send(&1).unwrap();
    queue.send(&2).unwrap();

    let start = Instant::now();
    assert_eq!(queue.send_timeout(&3, Millis(20)), Err(Error::Timeout));
    assert!(start.elapsed() >= Duration::from_millis(20));

    let reader = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        queue.receive()
    });
    let start = Instant::now();
    queue.send(&3).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(reader.join().unwrap(), Ok(1));

    assert_eq!(queue.receive(), Ok(2));
    assert_eq!(queue.receive(), Ok(3));
    assert!(queue.is_empty());
}

#[test]
fn receive_times_out_on_empty_queue() {
    kobj_define! {
        static QUEUE: StaticQueue<u8, 3>;
    }
    let queue = QUEUE.init_once(()).unwrap();
    let start = Instant::now();
    assert_eq!(queue.receive_timeout(Millis(15)), Err(Error::Timeout));
    assert!(start.elapsed() >= Duration::from_millis(15));
    assert_eq!(queue.receive_timeout(NoWait), Err(Error::Timeout));
}

#[test]
fn isr_send_wakes_receiver() {
    kobj_define! {
        static QUEUE: StaticQueue<[u8; 3], 2>;
    }
    let queue = QUEUE.init_once(()).unwrap();
    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || tx.send(queue.receive_timeout(Millis(5000))).unwrap());
    thread::sleep(Duration::from_millis(30));
    isr(|| queue.send_from_isr(&[9, 8, 7])).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Ok([9, 8, 7]));
    reader.join().unwrap();
}

#[test]
fn many_producers_keep_per_producer_order() {
    const PRODUCERS: u32 = 3;
    const PER_PRODUCER: u32 = 300;

    kobj_define! {
        static QUEUE: StaticQueue<(u32, u32), 5>;
    }
    let queue = QUEUE.init_once(()).unwrap();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            thread::spawn(move || {
                let mut rng = Pcg32::seed_from_u64(id as u64 + 1);
                for seq in 0..PER_PRODUCER {
                    if rng.gen_range(0..4) == 0 {
                        // An interrupt handler cannot wait, so it retries later.
                        while isr(|| queue.send_from_isr(&(id, seq))) == Err(Error::ResourceExhausted) {
                            thread::sleep(Duration::from_micros(100));
                        }
                    } else {
                        queue.send_timeout(&(id, seq), Forever).unwrap();
                    }
                    if rng.gen_range(0..8) == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let mut next = [0u32; PRODUCERS as usize];
    let mut rng = Pcg32::new(1, 1);
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let (id, seq) = queue.receive_timeout(Millis(5000)).unwrap();
        assert_eq!(seq, next[id as usize], "producer {} out of order", id);
        next[id as usize] += 1;
        if rng.gen_range(0..16) == 0 {
            thread::sleep(Duration::from_micros(200));
        }
    }
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(next, [PER_PRODUCER; PRODUCERS as usize]);
    assert!(queue.is_empty());
}
