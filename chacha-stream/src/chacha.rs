//! ChaCha context: block buffering, exhaustion tracking and the public
//! encrypt/decrypt/keystream operations.

use core::{
    cmp,
    fmt::{self, Debug},
};

use cfg_if::cfg_if;

use crate::{
    BLOCK_SIZE, Error, Rounds, Status, Tuning,
    block::{self, Block},
    state::State,
    xor,
};

#[cfg(feature = "parallel")]
use crate::parallel::{self, Semaphore};

#[cfg(feature = "zeroize")]
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A ChaCha stream cipher context (original 64-bit nonce construction).
///
/// Holds the key, nonce, 64-bit block counter and round count, plus the most
/// recently generated keystream block and how much of it has been used. A
/// message can be processed in any number of calls; the output equals that of
/// a single call over the concatenated input.
///
/// Long requests are split into chunks that are computed on a bounded worker
/// pool when the `parallel` feature is enabled; see [`Tuning`].
///
/// A context must not be driven from several threads at once; it is `Send`
/// and every operation takes `&mut self`.
pub struct ChaCha {
    state: State,
    rounds: Rounds,
    buffer: Block,
    /// Bytes of `buffer` already used, in `0..=BLOCK_SIZE`.
    next: usize,
    /// The counter cycled while generating the block in `buffer`.
    exhausted: bool,
    /// `Status::Exhausted` has been returned since the last reseek.
    reported: bool,
    tuning: Tuning,
    #[cfg(feature = "parallel")]
    admission: Semaphore,
}

impl ChaCha {
    /// Create a 20-round context from a 16- or 32-byte key and an 8-byte nonce.
    ///
    /// # Errors
    /// Returns [`Error::InvalidKeyLength`] or [`Error::InvalidNonceLength`].
    pub fn new(key: &[u8], nonce: &[u8]) -> Result<Self, Error> {
        Self::with_tuning(key, nonce, Tuning::default())
    }

    /// Create a 20-round context with explicit parallel tuning.
    ///
    /// # Errors
    /// Returns [`Error::InvalidKeyLength`] or [`Error::InvalidNonceLength`].
    pub fn with_tuning(key: &[u8], nonce: &[u8], tuning: Tuning) -> Result<Self, Error> {
        let mut state = State::default();
        state.set_key(key)?;
        state.set_nonce(nonce)?;
        Ok(Self::from_state(state, tuning))
    }

    pub(crate) fn from_state(state: State, tuning: Tuning) -> Self {
        Self {
            state,
            rounds: Rounds::R20,
            buffer: [0u8; BLOCK_SIZE],
            next: BLOCK_SIZE,
            exhausted: false,
            reported: false,
            tuning,
            #[cfg(feature = "parallel")]
            admission: Semaphore::new(tuning.max_workers()),
        }
    }

    /// Load a new 16- or 32-byte key.
    ///
    /// The counter is left where it is; any unused bytes of the buffered
    /// block are discarded so the next byte comes from the new key. If those
    /// were the last bytes of the keystream, the next request reports
    /// [`Status::Exhausted`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidKeyLength`]; the context is unchanged.
    pub fn key_setup(&mut self, key: &[u8]) -> Result<(), Error> {
        self.state.set_key(key)?;
        self.next = BLOCK_SIZE;
        Ok(())
    }

    /// Load a new 8-byte nonce and rewind to block 0.
    ///
    /// # Errors
    /// Returns [`Error::InvalidNonceLength`]; the context is unchanged.
    pub fn iv_setup(&mut self, nonce: &[u8]) -> Result<(), Error> {
        self.state.set_nonce(nonce)?;
        self.seek(0);
        Ok(())
    }

    /// Set the number of rounds: 8, 12 or 20.
    ///
    /// Unused bytes of the buffered block are discarded.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRoundCount`]; the context is unchanged.
    pub fn set_rounds(&mut self, rounds: u32) -> Result<(), Error> {
        self.rounds = Rounds::try_from(rounds)?;
        self.next = BLOCK_SIZE;
        Ok(())
    }

    /// Round count in use.
    #[must_use]
    pub fn rounds(&self) -> Rounds {
        self.rounds
    }

    /// Position the stream at the start of absolute block `block`.
    ///
    /// Clears exhaustion, so this also recovers a context whose keystream
    /// has run out.
    pub fn seek(&mut self, block: u64) {
        self.state.set_counter(block);
        self.exhausted = false;
        self.reported = false;
        self.next = BLOCK_SIZE;
    }

    /// Counter value of the next block to be generated.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.state.counter()
    }

    /// Whether the block counter has cycled. Bytes of the final block may
    /// still be available.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Current parallel tuning.
    #[must_use]
    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    /// Replace the parallel tuning.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        #[cfg(feature = "parallel")]
        if tuning.max_workers() != self.tuning.max_workers() {
            self.admission = Semaphore::new(tuning.max_workers());
        }
        self.tuning = tuning;
    }

    /// Set blocks per chunk and maximum concurrent workers; `0` keeps the
    /// default for either.
    pub fn tune_parallel(&mut self, blocks_per_chunk: usize, max_workers: usize) {
        let tuning = self
            .tuning
            .with_blocks_per_chunk(blocks_per_chunk)
            .with_max_workers(max_workers);
        self.set_tuning(tuning);
    }

    /// Enable or disable parallel processing.
    pub fn use_parallel(&mut self, parallel: bool) {
        let tuning = self.tuning.with_parallel(parallel);
        self.set_tuning(tuning);
    }

    /// Write `src` XOR keystream into the first `src.len()` bytes of `dst`.
    ///
    /// Once the keystream runs out the call returns [`Status::Exhausted`]
    /// with the number of bytes actually encrypted; a request made after the
    /// final byte was consumed returns `Exhausted(0)`.
    ///
    /// # Errors
    /// Returns [`Error::InsufficientOutputSpace`] if `dst` is shorter than
    /// `src`, or [`Error::UseAfterExhaustion`] if exhaustion has already
    /// been reported. `dst` is not modified on error.
    pub fn encrypt(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Status, Error> {
        if dst.len() < src.len() {
            return Err(Error::InsufficientOutputSpace {
                needed: src.len(),
                available: dst.len(),
            });
        }

        self.process(&mut dst[..src.len()], Input::Source(src))
    }

    /// Decrypt `src` into `dst`; identical to [`ChaCha::encrypt`].
    ///
    /// The context must be at the key, nonce, round count and position used
    /// for encryption.
    ///
    /// # Errors
    /// See [`ChaCha::encrypt`].
    pub fn decrypt(&mut self, src: &[u8], dst: &mut [u8]) -> Result<Status, Error> {
        self.encrypt(src, dst)
    }

    /// XOR keystream into `buf` in place.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterExhaustion`] if the keystream has already
    /// been reported exhausted.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) -> Result<Status, Error> {
        self.process(buf, Input::InPlace)
    }

    /// Overwrite `buf` with raw keystream.
    ///
    /// If the keystream runs out part way, bytes past the returned count are
    /// zeroed.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterExhaustion`] if the keystream has already
    /// been reported exhausted; `buf` is left untouched.
    pub fn keystream(&mut self, buf: &mut [u8]) -> Result<Status, Error> {
        self.process(buf, Input::Zeros)
    }

    /// Fill `buf` with pseudorandom bytes from the keystream.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterExhaustion`] if the keystream has already
    /// been reported exhausted.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Status, Error> {
        self.keystream(buf)
    }

    /// Keystream bytes left before the counter space runs out.
    #[cfg_attr(not(feature = "cipher"), allow(dead_code))]
    pub(crate) fn remaining(&self) -> u128 {
        let buffered = (BLOCK_SIZE - self.next) as u128;
        if self.exhausted {
            buffered
        } else {
            let blocks = u128::from(u64::MAX - self.state.counter()) + 1;
            blocks * BLOCK_SIZE as u128 + buffered
        }
    }

    /// The final block has been generated and fully consumed.
    #[inline(always)]
    fn is_drained(&self) -> bool {
        self.exhausted && self.next == BLOCK_SIZE
    }

    /// Serve one request: the terminal/misuse checks come before `data` is
    /// touched.
    fn process(&mut self, mut data: &mut [u8], input: Input<'_>) -> Result<Status, Error> {
        if self.reported {
            return Err(Error::UseAfterExhaustion);
        }
        if self.is_drained() {
            self.reported = true;
            return Ok(Status::Exhausted(0));
        }

        match input {
            Input::InPlace => {}
            Input::Zeros => data.fill(0),
            Input::Source(src) => data.copy_from_slice(src),
        }
        let total = data.len();

        let n = self.xor_buffered(data);
        data = &mut core::mem::take(&mut data)[n..];

        cfg_if! {
            if #[cfg(feature = "parallel")] {
                if !data.is_empty() && !self.exhausted {
                    let n = self.process_parallel(data);
                    data = &mut core::mem::take(&mut data)[n..];
                }
            }
        }

        while !data.is_empty() {
            if self.exhausted {
                self.reported = true;
                return Ok(Status::Exhausted(total - data.len()));
            }
            self.refill();
            let n = self.xor_buffered(data);
            data = &mut core::mem::take(&mut data)[n..];
        }

        Ok(Status::Complete(total))
    }

    #[cfg(feature = "parallel")]
    fn process_parallel(&mut self, data: &mut [u8]) -> usize {
        debug_assert_eq!(self.next, BLOCK_SIZE);
        match parallel::xor_chunks(&self.state, self.rounds, &self.tuning, &self.admission, data) {
            Some(batch) => {
                self.seek(batch.next_counter);
                batch.len
            }
            None => 0,
        }
    }

    /// XOR the unused part of the buffered block into the front of `data`.
    #[inline(always)]
    fn xor_buffered(&mut self, data: &mut [u8]) -> usize {
        let n = cmp::min(BLOCK_SIZE - self.next, data.len());
        xor(&mut data[..n], &self.buffer[self.next..self.next + n]);
        self.next += n;
        n
    }

    /// Generate the block at the current counter and advance the counter.
    #[inline(always)]
    fn refill(&mut self) {
        self.buffer = block::generate(&self.state.words, self.rounds);
        self.exhausted = self.state.increment();
        self.next = 0;

        if self.exhausted {
            log::debug!("block counter cycled; final keystream block buffered");
        }
    }
}

/// Where the bytes XORed with keystream come from.
enum Input<'a> {
    /// The output buffer already holds them.
    InPlace,
    /// All zero: the output becomes raw keystream.
    Zeros,
    /// Copied from a separate source of the same length.
    Source(&'a [u8]),
}

impl Debug for ChaCha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaCha")
            .field("rounds", &self.rounds)
            .field("tuning", &self.tuning)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "zeroize")]
impl Drop for ChaCha {
    fn drop(&mut self) {
        self.state.zeroize();
        self.buffer.zeroize();
    }
}

#[cfg(feature = "zeroize")]
impl ZeroizeOnDrop for ChaCha {}
