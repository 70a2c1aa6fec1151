use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use raftring::{PodRing, RingConfig, SignalCode};
use std::sync::Arc;
use std::thread;

const MSGS: u64 = 5_000_000;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");
    group.throughput(Throughput::Elements(MSGS));

    group.bench_function("single_producer_consumer", |b| {
        b.iter(|| {
            let ring = Arc::new(PodRing::<u32>::new(RingConfig::default()));

            let producer_ring = Arc::clone(&ring);
            let producer = thread::spawn(move || {
                for i in 0..MSGS {
                    producer_ring.push(Some(i as u32), SignalCode::None);
                }
            });

            let mut count = 0u64;
            while count < MSGS {
                let (_, _) = ring.pop().unwrap();
                black_box(());
                count += 1;
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_allocate_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_send");
    group.throughput(Throughput::Elements(MSGS));

    group.bench_function("reserve_commit", |b| {
        b.iter(|| {
            let ring = Arc::new(PodRing::<u32>::new(RingConfig::default()));

            let producer_ring = Arc::clone(&ring);
            let producer = thread::spawn(move || {
                for i in 0..MSGS {
                    let mut slot = producer_ring.allocate();
                    slot.write(i as u32);
                    slot.send(SignalCode::None);
                }
            });

            let mut count = 0u64;
            while count < MSGS {
                let guard = ring.peek().unwrap();
                black_box(guard.get());
                guard.recycle();
                count += 1;
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_sizes");

    for batch_size in [16u32, 64, 256, 1024].iter() {
        let total = MSGS;
        group.throughput(Throughput::Elements(total));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("batch_{batch_size}")),
            batch_size,
            |b, &batch| {
                b.iter(|| {
                    let ring = Arc::new(PodRing::<u32>::new(RingConfig::new(16, 1024, false)));

                    let producer_ring = Arc::clone(&ring);
                    let producer = thread::spawn(move || {
                        let mut sent = 0u64;
                        while sent < total {
                            let want = batch.min((total - sent) as u32).max(1);
                            let mut range = producer_ring.allocate_n(want);
                            for i in 0..want {
                                range.write_at(i, (sent + u64::from(i)) as u32);
                            }
                            range.send(SignalCode::None);
                            sent += u64::from(want);
                        }
                    });

                    let mut count = 0u64;
                    while count < total {
                        let want = batch.min((total - count) as u32).max(1);
                        if let Ok(peeked) = ring.peek_range(want) {
                            for i in 0..want {
                                black_box(peeked.get(i));
                            }
                            peeked.recycle();
                            count += u64::from(want);
                        }
                    }

                    producer.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_external_discipline(c: &mut Criterion) {
    use raftring::ExternalRing;

    let mut group = c.benchmark_group("external_discipline");
    let msgs = 500_000u64;
    group.throughput(Throughput::Elements(msgs));

    group.bench_function("boxed_payload_round_trip", |b| {
        b.iter(|| {
            let ring = Arc::new(ExternalRing::<[u64; 8]>::new(RingConfig::default()));

            let producer_ring = Arc::clone(&ring);
            let producer = thread::spawn(move || {
                for i in 0..msgs {
                    producer_ring.push(Some([i; 8]), SignalCode::None);
                }
            });

            let mut count = 0u64;
            while count < msgs {
                let (value, _) = ring.pop().unwrap();
                black_box(value);
                count += 1;
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_push_pop,
    bench_allocate_send,
    bench_batch_sizes,
    bench_external_discipline
);
criterion_main!(benches);
