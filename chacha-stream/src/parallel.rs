//! Chunked parallel keystream application.
//!
//! Every ChaCha block is a function of the input words and its own counter
//! value only, so a run of blocks can be split into chunks that are computed
//! independently. Each worker gets a private copy of the state positioned at
//! its chunk's first counter value and a disjoint slice of the output, so the
//! result does not depend on which worker finishes first.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use rayon::Yield;

use crate::{BLOCK_SIZE, Rounds, Tuning, block, state::State, xor};

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// Counting semaphore bounding how many chunk workers are in flight.
///
/// Permits are taken by the dispatching thread before a chunk is spawned
/// and released when the chunk finishes, so tasks never sit in the pool
/// waiting for admission. Owned by a single context, so independently tuned
/// contexts never compete for the same permits.
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    released: Condvar,
}

/// Permit held by a running worker; returned to the semaphore on drop.
pub(crate) struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    /// Block until a permit is free and take it.
    ///
    /// On a rayon worker thread, queued pool work is run while waiting so
    /// that chunks spawned from this thread can finish and return permits.
    pub(crate) fn acquire(&self) -> Permit<'_> {
        loop {
            let mut permits = self.lock();
            if *permits > 0 {
                *permits -= 1;
                return Permit { semaphore: self };
            }
            drop(permits);

            if let Some(Yield::Executed) = rayon::yield_now() {
                continue;
            }

            // nothing is queued: every outstanding chunk is running elsewhere
            let mut permits = self.lock();
            while *permits == 0 {
                permits = self
                    .released
                    .wait(permits)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            *permits -= 1;
            return Permit { semaphore: self };
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn available(&self) -> usize {
        *self.lock()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut permits = self.semaphore.lock();
        *permits += 1;
        self.semaphore.released.notify_one();
    }
}

/// Result of a dispatched batch.
#[derive(Debug)]
pub(crate) struct Batch {
    /// Bytes of `data` that were processed, always a whole number of chunks.
    pub(crate) len: usize,
    /// Counter value following the last processed block.
    pub(crate) next_counter: u64,
}

/// XOR as many whole chunks of `data` as possible with keystream, starting at
/// the block counter held in `state`.
///
/// Returns `None` without touching `data` when the request is below the
/// parallel threshold or when the batch would run into the last block of the
/// 64-bit counter space; the caller then continues sequentially, which keeps
/// exhaustion handling in one place.
pub(crate) fn xor_chunks(
    state: &State,
    rounds: Rounds,
    tuning: &Tuning,
    admission: &Semaphore,
    data: &mut [u8],
) -> Option<Batch> {
    if !tuning.is_parallel() || data.len() < tuning.parallel_threshold() {
        return None;
    }

    let blocks_per_chunk = tuning.blocks_per_chunk();
    let chunk_bytes = tuning.chunk_bytes();
    let chunks = data.len() / chunk_bytes;

    let base = state.counter();
    let blocks = u64::try_from(chunks.checked_mul(blocks_per_chunk)?).ok()?;
    let Some(next_counter) = base.checked_add(blocks) else {
        log::debug!(
            "parallel batch of {chunks} chunks from block {base} would cross the counter wraparound; \
             processing sequentially"
        );
        return None;
    };

    log::trace!("dispatching {chunks} chunks of {blocks_per_chunk} blocks from block {base}");

    let len = chunks * chunk_bytes;
    let step = blocks_per_chunk as u64;
    rayon::scope(|scope| {
        for (i, chunk) in data[..len].chunks_exact_mut(chunk_bytes).enumerate() {
            let mut worker_state = *state;
            worker_state.set_counter(base + i as u64 * step);
            let permit = admission.acquire();
            scope.spawn(move |_| {
                apply_chunk(&mut worker_state, rounds, chunk);
                drop(permit);
            });
        }
    });

    Some(Batch { len, next_counter })
}

/// Sequentially XOR `chunk` with keystream generated from a private state.
fn apply_chunk(state: &mut State, rounds: Rounds, chunk: &mut [u8]) {
    for out in chunk.chunks_exact_mut(BLOCK_SIZE) {
        #[cfg_attr(not(feature = "zeroize"), allow(unused_mut))]
        let mut keystream = block::generate(&state.words, rounds);
        state.increment();
        xor(out, &keystream);

        #[cfg(feature = "zeroize")]
        keystream.zeroize();
    }

    #[cfg(feature = "zeroize")]
    state.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn state_at(counter: u64) -> State {
        let mut state = State::default();
        state.set_key(&[0x42; 32]).unwrap();
        state.set_nonce(&[0x24; 8]).unwrap();
        state.set_counter(counter);
        state
    }

    fn sequential(state: &State, rounds: Rounds, data: &mut [u8]) {
        let mut state = *state;
        for out in data.chunks_mut(BLOCK_SIZE) {
            let keystream = block::generate(&state.words, rounds);
            state.increment();
            xor(out, &keystream[..out.len()]);
        }
    }

    #[test]
    fn semaphore_bounds_concurrency() {
        let semaphore = Arc::new(Semaphore::new(3));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    let _permit = semaphore.acquire();
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(2));
                    running.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn permits_return_after_batch() {
        let tuning = Tuning::new().with_blocks_per_chunk(1).with_max_workers(3);
        let semaphore = Semaphore::new(tuning.max_workers());
        let mut data = [0u8; 64 * 40];
        let batch = xor_chunks(&state_at(0), Rounds::R8, &tuning, &semaphore, &mut data).unwrap();
        assert_eq!(batch.len, data.len());
        assert_eq!(semaphore.available(), 3);
    }

    #[test]
    fn single_permit_inside_single_thread_pool() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let tuning = Tuning::new().with_blocks_per_chunk(2).with_max_workers(1);
        let semaphore = Semaphore::new(tuning.max_workers());
        let state = state_at(11);

        let mut parallel = [0u8; 64 * 20];
        let batch = pool
            .install(|| xor_chunks(&state, Rounds::R20, &tuning, &semaphore, &mut parallel))
            .unwrap();
        assert_eq!(batch.next_counter, 31);

        let mut expected = [0u8; 64 * 20];
        sequential(&state, Rounds::R20, &mut expected);
        assert_eq!(parallel, expected);
        assert_eq!(semaphore.available(), 1);
    }

    #[test]
    fn below_threshold_is_declined() {
        let tuning = Tuning::new().with_blocks_per_chunk(4);
        let semaphore = Semaphore::new(2);
        let mut data = [0u8; 511];
        let batch = xor_chunks(&state_at(0), Rounds::R20, &tuning, &semaphore, &mut data);
        assert!(batch.is_none());
        assert_eq!(data, [0u8; 511]);
    }

    #[test]
    fn disabled_is_declined() {
        let tuning = Tuning::sequential().with_blocks_per_chunk(1);
        let semaphore = Semaphore::new(2);
        let mut data = [0u8; 1024];
        assert!(xor_chunks(&state_at(0), Rounds::R20, &tuning, &semaphore, &mut data).is_none());
    }

    #[test]
    fn chunks_match_sequential() {
        let tuning = Tuning::new().with_blocks_per_chunk(3).with_max_workers(2);
        let semaphore = Semaphore::new(tuning.max_workers());
        let state = state_at(7);

        let mut parallel = [0u8; 1000];
        let batch = xor_chunks(&state, Rounds::R12, &tuning, &semaphore, &mut parallel).unwrap();
        // 1000 bytes hold five 192-byte chunks
        assert_eq!(batch.len, 960);
        assert_eq!(batch.next_counter, 7 + 15);

        let mut expected = [0u8; 1000];
        sequential(&state, Rounds::R12, &mut expected[..960]);
        assert_eq!(parallel, expected);
    }

    #[test]
    fn wraparound_is_declined() {
        let tuning = Tuning::new().with_blocks_per_chunk(2);
        let semaphore = Semaphore::new(4);
        let mut data = [0u8; 256];

        // four blocks starting three blocks before the end of the counter space
        let state = state_at(u64::MAX - 2);
        assert!(xor_chunks(&state, Rounds::R20, &tuning, &semaphore, &mut data).is_none());

        // the final counter value itself is left to the sequential path
        let state = state_at(u64::MAX - 4);
        let batch = xor_chunks(&state, Rounds::R20, &tuning, &semaphore, &mut data).unwrap();
        assert_eq!(batch.len, 256);
        assert_eq!(batch.next_counter, u64::MAX);
    }
}
