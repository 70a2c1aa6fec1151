use raftring::{ClosedPortAccessError, PodRing, RingConfig, SignalCode};
use std::sync::Arc;
use std::thread;

fn small_config() -> RingConfig {
    RingConfig::new(6, 64, false) // 64 slots
}

#[test]
fn two_threads_fifo_ordering() {
    let ring = Arc::new(PodRing::<u64>::new(small_config()));
    const N: u64 = 200_000;

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        for i in 0..N {
            producer_ring.push(Some(i), SignalCode::None);
        }
        producer_ring.push(None, SignalCode::Eof);
    });

    let mut expected = 0u64;
    loop {
        match ring.pop() {
            Ok((Some(value), _)) => {
                assert_eq!(value, expected, "FIFO violation: expected {expected}, got {value}");
                expected += 1;
            }
            Ok((None, SignalCode::Eof)) => break,
            Ok((None, _)) => {}
            Err(ClosedPortAccessError) => break,
        }
    }

    producer.join().unwrap();
    assert_eq!(expected, N);
}

#[test]
fn two_threads_allocate_send_round_trip() {
    let ring = Arc::new(PodRing::<u64>::new(small_config()));
    const N: u64 = 50_000;

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        for i in 0..N {
            let mut slot = producer_ring.allocate();
            slot.write(i);
            slot.send(SignalCode::None);
        }
        producer_ring.push(None, SignalCode::Eof);
    });

    let mut expected = 0u64;
    loop {
        match ring.pop() {
            Ok((Some(value), _)) => {
                assert_eq!(value, expected);
                expected += 1;
            }
            Ok((None, SignalCode::Eof)) => break,
            Ok((None, _)) => {}
            Err(ClosedPortAccessError) => break,
        }
    }

    producer.join().unwrap();
    assert_eq!(expected, N);
}

#[test]
fn invalidate_unblocks_a_waiting_consumer() {
    let ring = Arc::new(PodRing::<u64>::new(small_config()));

    let consumer_ring = Arc::clone(&ring);
    let consumer = thread::spawn(move || consumer_ring.pop());

    // Give the consumer a chance to start blocking on an empty queue before
    // the port closes under it.
    thread::sleep(std::time::Duration::from_millis(20));
    ring.invalidate();

    let result = consumer.join().unwrap();
    assert_eq!(result, Err(ClosedPortAccessError));
}

#[test]
fn wrap_around_with_interleaved_pop() {
    // A small ring forces many wraps over the course of the run.
    let ring = PodRing::<u64>::new(RingConfig::new(3, 64, false)); // 8 slots
    const N: u64 = 10_000;

    let mut sent = 0u64;
    let mut received = 0u64;
    while sent < N {
        ring.push(Some(sent), SignalCode::None);
        sent += 1;
        if sent % 3 == 0 {
            let (v, _) = ring.pop().unwrap();
            assert_eq!(v, Some(received));
            received += 1;
        }
    }
    while received < sent {
        let (v, _) = ring.pop().unwrap();
        assert_eq!(v, Some(received));
        received += 1;
    }
    assert_eq!(ring.size(), 0);
}

#[test]
fn bulk_allocate_n_and_peek_range_across_threads() {
    let ring = Arc::new(PodRing::<u64>::new(RingConfig::new(5, 64, false))); // 32 slots
    const BATCH: u32 = 10;
    const N_BATCHES: u64 = 2_000;

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        for batch in 0..N_BATCHES {
            let mut range = producer_ring.allocate_n(BATCH);
            for i in 0..BATCH {
                range.write_at(i, batch * u64::from(BATCH) + u64::from(i));
            }
            range.send(SignalCode::None);
        }
    });

    let mut received = 0u64;
    while received < N_BATCHES * u64::from(BATCH) {
        let peeked = ring.peek_range(BATCH).unwrap();
        for i in 0..BATCH {
            assert_eq!(peeked.get(i), Some(&received));
            received += 1;
        }
        peeked.recycle();
    }

    producer.join().unwrap();
    assert_eq!(ring.size(), 0);
}

#[test]
fn quit_signal_terminates_push_side_without_payload() {
    let ring = PodRing::<u64>::new(small_config());
    ring.push(Some(1), SignalCode::None);
    ring.push(None, SignalCode::Quit);
    assert!(ring.write_finished());

    assert_eq!(ring.pop().unwrap(), (Some(1), SignalCode::None));
    assert_eq!(ring.pop().unwrap(), (None, SignalCode::Quit));
}

#[test]
fn resize_preserves_in_flight_items_across_threads() {
    let ring = Arc::new(PodRing::<u64>::new(RingConfig::new(3, 64, false))); // 8 slots
    const N: u64 = 5_000;

    let producer_ring = Arc::clone(&ring);
    let producer = thread::spawn(move || {
        for i in 0..N {
            producer_ring.push(Some(i), SignalCode::None);
        }
        producer_ring.push(None, SignalCode::Eof);
    });

    let resize_ring = Arc::clone(&ring);
    let resizer = thread::spawn(move || {
        thread::sleep(std::time::Duration::from_millis(5));
        resize_ring.resize(64);
    });

    let mut expected = 0u64;
    loop {
        match ring.pop() {
            Ok((Some(value), _)) => {
                assert_eq!(value, expected);
                expected += 1;
            }
            Ok((None, SignalCode::Eof)) => break,
            Ok((None, _)) => {}
            Err(ClosedPortAccessError) => break,
        }
    }

    producer.join().unwrap();
    resizer.join().unwrap();
    assert_eq!(expected, N);
}
