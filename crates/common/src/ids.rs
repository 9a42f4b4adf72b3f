//! Identifier generation
//!
//! [`SnowflakeGenerator`] produces 63-bit, time-ordered integer ids:
//!
//! ```text
//! | 41 bits: ms since custom epoch | 10 bits: worker | 12 bits: sequence |
//! ```
//!
//! There is no process-wide instance. Construct one generator per worker
//! and share it by reference (`Arc<SnowflakeGenerator>`) with whoever needs
//! ids. A clock that moves backwards is reported as an error; the generator
//! never reuses a sequence number to paper over it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use thiserror::Error;

const WORKER_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_BITS: u32 = 41;

/// 2020-01-01T00:00:00Z in milliseconds.
pub const DEFAULT_EPOCH_MS: u64 = 1_577_836_800_000;

/// Errors raised by identifier generators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Worker id {worker_id} out of range (max 1023)")]
    InvalidWorkerId { worker_id: u16 },

    #[error("Clock moved backwards: last issued at {last_ms} ms, clock now reads {now_ms} ms")]
    ClockMovedBackwards { last_ms: u64, now_ms: u64 },

    #[error("Clock reads {now_ms} ms, before the generator epoch {epoch_ms} ms")]
    BeforeEpoch { now_ms: u64, epoch_ms: u64 },

    #[error("Timestamp space exhausted for epoch {epoch_ms}")]
    TimestampOverflow { epoch_ms: u64 },
}

/// Millisecond wall clock abstraction
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the UNIX epoch
    fn now_ms(&self) -> u64;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// Clock whose reading is set explicitly, for tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: Arc::new(AtomicU64::new(start_ms)) }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: u64,
    sequence: u64,
}

/// Time-ordered 64-bit id generator
pub struct SnowflakeGenerator {
    worker_id: u16,
    epoch_ms: u64,
    clock: Box<dyn Clock>,
    state: Mutex<SnowflakeState>,
}

impl std::fmt::Debug for SnowflakeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeGenerator")
            .field("worker_id", &self.worker_id)
            .field("epoch_ms", &self.epoch_ms)
            .finish_non_exhaustive()
    }
}

impl SnowflakeGenerator {
    /// Create a generator for `worker_id` (0..=1023).
    pub fn new(worker_id: u16, epoch_ms: u64, clock: impl Clock) -> Result<Self, IdError> {
        if worker_id > MAX_WORKER_ID {
            return Err(IdError::InvalidWorkerId { worker_id });
        }

        Ok(Self {
            worker_id,
            epoch_ms,
            clock: Box::new(clock),
            state: Mutex::new(SnowflakeState::default()),
        })
    }

    /// Generator on the system clock with [`DEFAULT_EPOCH_MS`].
    pub fn with_worker(worker_id: u16) -> Result<Self, IdError> {
        Self::new(worker_id, DEFAULT_EPOCH_MS, SystemClock)
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    /// Issue the next id.
    ///
    /// # Errors
    ///
    /// `ClockMovedBackwards` when the clock reads earlier than the last
    /// issued timestamp; `BeforeEpoch` / `TimestampOverflow` when the clock
    /// falls outside the 41-bit window.
    pub fn next_id(&self) -> Result<u64, IdError> {
        let mut state = self.state.lock();
        let mut now = self.clock.now_ms();

        if now < state.last_ms {
            return Err(IdError::ClockMovedBackwards { last_ms: state.last_ms, now_ms: now });
        }

        let sequence = if now == state.last_ms {
            let next = (state.sequence + 1) & MAX_SEQUENCE;
            if next == 0 {
                // Sequence space for this millisecond is spent.
                now = self.wait_past(state.last_ms)?;
            }
            next
        } else {
            0
        };

        let elapsed = now
            .checked_sub(self.epoch_ms)
            .ok_or(IdError::BeforeEpoch { now_ms: now, epoch_ms: self.epoch_ms })?;
        if elapsed >> TIMESTAMP_BITS != 0 {
            return Err(IdError::TimestampOverflow { epoch_ms: self.epoch_ms });
        }

        state.last_ms = now;
        state.sequence = sequence;

        Ok((elapsed << (WORKER_BITS + SEQUENCE_BITS))
            | (u64::from(self.worker_id) << SEQUENCE_BITS)
            | sequence)
    }

    /// Spin until the clock passes `last_ms`, failing if it falls behind it.
    fn wait_past(&self, last_ms: u64) -> Result<u64, IdError> {
        loop {
            let now = self.clock.now_ms();
            if now > last_ms {
                return Ok(now);
            }
            if now < last_ms {
                return Err(IdError::ClockMovedBackwards { last_ms, now_ms: now });
            }
            std::hint::spin_loop();
        }
    }

    /// Split an id into `(timestamp_ms, worker_id, sequence)`.
    pub fn decompose(&self, id: u64) -> (u64, u16, u64) {
        let timestamp = (id >> (WORKER_BITS + SEQUENCE_BITS)) + self.epoch_ms;
        let worker = ((id >> SEQUENCE_BITS) & u64::from(MAX_WORKER_ID)) as u16;
        (timestamp, worker, id & MAX_SEQUENCE)
    }
}

/// Opaque, time-ordered string key (UUID v7).
pub fn time_ordered_key() -> String {
    uuid::Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    const START: u64 = DEFAULT_EPOCH_MS + 10_000;

    #[test]
    fn ids_increase_within_one_millisecond() {
        let clock = ManualClock::new(START);
        let generator = SnowflakeGenerator::new(7, DEFAULT_EPOCH_MS, clock).unwrap();

        let first = generator.next_id().unwrap();
        let second = generator.next_id().unwrap();

        assert!(second > first);
        assert_eq!(generator.decompose(first), (START, 7, 0));
        assert_eq!(generator.decompose(second), (START, 7, 1));
    }

    #[test]
    fn sequence_resets_on_new_millisecond() {
        let clock = ManualClock::new(START);
        let generator = SnowflakeGenerator::new(1, DEFAULT_EPOCH_MS, clock.clone()).unwrap();

        generator.next_id().unwrap();
        generator.next_id().unwrap();
        clock.advance(1);
        let id = generator.next_id().unwrap();

        assert_eq!(generator.decompose(id), (START + 1, 1, 0));
    }

    #[test]
    fn clock_regression_is_an_error() {
        let clock = ManualClock::new(START);
        let generator = SnowflakeGenerator::new(1, DEFAULT_EPOCH_MS, clock.clone()).unwrap();

        generator.next_id().unwrap();
        clock.set(START - 5);

        assert_eq!(
            generator.next_id(),
            Err(IdError::ClockMovedBackwards { last_ms: START, now_ms: START - 5 })
        );
    }

    #[test]
    fn rejects_out_of_range_worker() {
        let result = SnowflakeGenerator::new(1024, DEFAULT_EPOCH_MS, ManualClock::new(START));
        assert!(matches!(result, Err(IdError::InvalidWorkerId { worker_id: 1024 })));
    }

    #[test]
    fn clock_before_epoch_is_an_error() {
        let generator =
            SnowflakeGenerator::new(0, DEFAULT_EPOCH_MS, ManualClock::new(1_000)).unwrap();
        assert!(matches!(generator.next_id(), Err(IdError::BeforeEpoch { .. })));
    }

    /// Frozen at `START` for a fixed number of reads, then jumps to `after`.
    struct SteppingClock {
        reads: AtomicUsize,
        frozen_reads: usize,
        after: u64,
    }

    impl Clock for SteppingClock {
        fn now_ms(&self) -> u64 {
            let read = self.reads.fetch_add(1, Ordering::SeqCst);
            if read < self.frozen_reads {
                START
            } else {
                self.after
            }
        }
    }

    #[test]
    fn sequence_overflow_waits_for_next_millisecond() {
        let per_ms = (MAX_SEQUENCE + 1) as usize;
        let clock = SteppingClock { reads: AtomicUsize::new(0), frozen_reads: per_ms + 3, after: START + 1 };
        let generator = SnowflakeGenerator::new(2, DEFAULT_EPOCH_MS, clock).unwrap();

        let mut last = 0;
        for _ in 0..per_ms {
            let id = generator.next_id().unwrap();
            assert!(id > last || last == 0);
            last = id;
        }

        let rolled = generator.next_id().unwrap();
        assert!(rolled > last);
        assert_eq!(generator.decompose(rolled), (START + 1, 2, 0));
    }

    #[test]
    fn clock_regression_while_waiting_for_next_millisecond_is_an_error() {
        let per_ms = (MAX_SEQUENCE + 1) as usize;
        let clock = SteppingClock { reads: AtomicUsize::new(0), frozen_reads: per_ms + 1, after: START - 1 };
        let generator = SnowflakeGenerator::new(3, DEFAULT_EPOCH_MS, clock).unwrap();

        for _ in 0..per_ms {
            generator.next_id().unwrap();
        }

        let expected = IdError::ClockMovedBackwards { last_ms: START, now_ms: START - 1 };
        assert_eq!(generator.next_id(), Err(expected.clone()));
        assert_eq!(generator.next_id(), Err(expected));
    }

    #[test]
    fn time_ordered_keys_are_unique() {
        let a = time_ordered_key();
        let b = time_ordered_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
