use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use seqring_rs::config::RingConfig;
use seqring_rs::{Ring, Stream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

const RESERVATIONS: u64 = 2_000_000;
const BATCH: i64 = 256;

fn bench_ring_single_writer_single_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_spsc");
    group.throughput(Throughput::Elements(RESERVATIONS));

    group.bench_function("reserve_commit_consume", |b| {
        b.iter(|| {
            let ring = Ring::with_config(RingConfig::new(16, false)); // 64K slots
            let mut writer = ring.new_writer();
            let mut reader = ring.new_reader();

            let handle = thread::spawn(move || {
                let mut sent = 0u64;
                while sent < RESERVATIONS {
                    let want = BATCH.min((RESERVATIONS - sent) as i64);
                    writer.reserve(want);
                    writer.commit();
                    sent += want as u64;
                }
            });

            let mut seen = 0u64;
            while seen < RESERVATIONS {
                let seq = reader.next();
                black_box(seq);
                seen += 1;
            }

            handle.join().unwrap();
        });
    });

    group.finish();
}

fn bench_ring_contended_writers(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_mpsc_writers");

    for num_writers in [2, 4, 8].iter() {
        let per_writer = 200_000u64;
        let total = per_writer * (*num_writers as u64);
        group.throughput(Throughput::Elements(total));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_writers}W_1R")),
            num_writers,
            |b, &n| {
                b.iter(|| {
                    let ring = Ring::with_config(RingConfig::new(18, false)); // 256K slots
                    let counter = Arc::new(AtomicU64::new(0));

                    let mut handles = Vec::new();
                    for _ in 0..n {
                        let ring = Arc::clone(&ring);
                        let counter = Arc::clone(&counter);
                        handles.push(thread::spawn(move || {
                            let mut writer = ring.new_writer();
                            for _ in 0..per_writer {
                                writer.reserve(1);
                                writer.commit();
                                counter.fetch_add(1, Ordering::Relaxed);
                            }
                        }));
                    }

                    let mut reader = ring.new_reader();
                    let target = per_writer * (n as u64);
                    let mut seen = 0u64;
                    while seen < target {
                        black_box(reader.next());
                        seen += 1;
                    }

                    for h in handles {
                        h.join().unwrap();
                    }
                    assert_eq!(counter.load(Ordering::Relaxed), target);
                });
            },
        );
    }

    group.finish();
}

fn bench_stream_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_push");
    let pushes = 500_000u64;
    group.throughput(Throughput::Elements(pushes));

    group.bench_function("sequential_push", |b| {
        b.iter(|| {
            let stream = Stream::<u64>::new();
            for i in 0..pushes {
                black_box(stream.push(i));
            }
        });
    });

    group.finish();
}

fn bench_stream_push_and_follow(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_push_follow");
    let pushes = 200_000u64;
    group.throughput(Throughput::Elements(pushes));

    group.bench_function("producer_consumer", |b| {
        b.iter(|| {
            let stream = Stream::<u64>::new();
            let first = stream.push(0).unwrap();

            let producer_stream = Arc::clone(&stream);
            let handle = thread::spawn(move || {
                for i in 1..pushes {
                    producer_stream.push(i);
                }
                producer_stream.done();
            });

            let mut entry = first;
            let mut count = 1u64;
            while let Some(next) = entry.next() {
                black_box(next.value());
                entry = next;
                count += 1;
            }

            handle.join().unwrap();
            black_box(count);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_ring_single_writer_single_reader,
    bench_ring_contended_writers,
    bench_stream_push,
    bench_stream_push_and_follow
);
criterion_main!(benches);
