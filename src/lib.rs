//! seqring - lock-light concurrent sequencing primitives
//!
//! Two building blocks for coordinating producers and consumers without a
//! mutex around the data path:
//!
//! - [`stream`]: an unbounded, append-only, multi-reader sequence. Every
//!   push gets a permanent sequence number and a handle ([`stream::Entry`])
//!   that can walk forward to later entries, blocking on ones not yet
//!   committed. Memory for consumed entries is reclaimed once no reader
//!   holds a handle into them.
//! - [`ring`]: a bounded, power-of-two sequencer. A single writer chain
//!   reserves and commits contiguous windows of sequence numbers; many
//!   readers consume them, gated so a writer never overwrites a slot a
//!   reader hasn't moved past. The ring hands out sequence numbers only;
//!   callers index their own buffer with `seq & mask`.
//!
//! Both are built on [`Semaphore`](semaphore::Semaphore), a hand-off
//! counting semaphore that lets exactly one waiting thread consume a
//! release, which is what makes the writer hand-off chain in [`ring`] safe
//! without a lock around the whole reserve/commit path.
//!
//! # Examples
//!
//! ```
//! use seqring_rs::stream::Stream;
//!
//! let stream = Stream::<u32>::new();
//! let first = stream.push(1).unwrap();
//! let second = stream.push(2).unwrap();
//!
//! assert_eq!(first.value(), Some(&1));
//! assert_eq!(first.next().unwrap().seq(), second.seq());
//! ```
//!
//! ```
//! use seqring_rs::ring::Ring;
//!
//! let ring = Ring::new(); // 1024 slots
//! let mut writer = ring.new_writer();
//! let mut reader = ring.new_reader();
//!
//! let seq = writer.reserve(1);
//! writer.commit();
//! assert_eq!(reader.next(), seq);
//! ```

mod backoff;
mod invariants;
mod semaphore;

pub mod config;
pub mod error;
pub mod metrics;
pub mod ring;
pub mod stream;

pub use config::{RingConfig, StreamConfig};
pub use error::RingError;
pub use metrics::{RingMetrics, StreamMetrics};
pub use ring::Ring;
pub use semaphore::Semaphore;
pub use stream::Stream;
