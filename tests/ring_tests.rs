use seqring_rs::config::RingConfig;
use seqring_rs::Ring;
use std::sync::Arc;
use std::thread;

const RING_SIZE_BITS: u8 = 10; // 1024 slots
const N: i64 = 20_000;

#[test]
fn multi_reader_single_writer_sees_every_seq_at_its_own_slot() {
    let ring = Ring::with_config(RingConfig::new(RING_SIZE_BITS, false));
    let mask = ring.mask();
    let data: Arc<Vec<std::sync::atomic::AtomicI64>> = Arc::new(
        (0..=mask)
            .map(|_| std::sync::atomic::AtomicI64::new(-1))
            .collect(),
    );

    let num_readers = 4usize.min(
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4),
    );

    let mut reader_handles = Vec::new();
    for _ in 0..num_readers {
        let ring = Arc::clone(&ring);
        let data = Arc::clone(&data);
        reader_handles.push(thread::spawn(move || {
            let mut reader = ring.new_reader();
            for _ in 0..N {
                let seq = reader.next();
                let idx = (seq & mask) as usize;
                let stored = data[idx].load(std::sync::atomic::Ordering::Acquire);
                assert_eq!(stored, seq, "reader observed wrong value at seq {seq}");
            }
        }));
    }

    let writer_ring = Arc::clone(&ring);
    let writer_data = Arc::clone(&data);
    let writer_handle = thread::spawn(move || {
        let mut writer = writer_ring.new_writer();
        for _ in 0..N {
            let seq = writer.reserve(1);
            let idx = (seq & mask) as usize;
            writer_data[idx].store(seq, std::sync::atomic::Ordering::Release);
            writer.commit();
        }
    });

    writer_handle.join().unwrap();
    for handle in reader_handles {
        handle.join().unwrap();
    }
}

#[test]
fn reader_sees_contiguous_window_from_batched_reservation() {
    let ring = Ring::with_config(RingConfig::new(6, false)); // 64 slots
    let mut writer = ring.new_writer();
    let mut reader = ring.new_reader();

    let seq = writer.reserve(10);
    writer.commit();

    for offset in 0..10 {
        assert_eq!(reader.next(), seq + offset);
    }
}

#[test]
#[should_panic(expected = "reader sequence")]
fn reader_that_falls_too_far_behind_panics() {
    let ring = Ring::with_config(RingConfig::new(2, false)); // 4 slots
    let mut writer = ring.new_writer();
    let mut reader = ring.new_reader();

    // Closing excludes the reader from the writer's gating calculation, so
    // the writer is now free to run arbitrarily far ahead of it.
    reader.close();
    for _ in 0..20 {
        writer.reserve(1);
        writer.commit();
    }

    // Any further use of a closed reader is undefined; `next` must detect
    // that its pending slot has long since been overwritten.
    reader.next();
}
