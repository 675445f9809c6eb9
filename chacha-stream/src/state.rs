//! Input words of the block function: constants, key, counter and nonce.

use crate::{Error, KEY_SIZE, NONCE_SIZE, STATE_WORDS};

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// State initialization constant for 32-byte keys ("expand 32-byte k")
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// State initialization constant for 16-byte keys ("expand 16-byte k")
const TAU: [u32; 4] = [0x6170_7865, 0x3120_646e, 0x7962_2d36, 0x6b20_6574];

/// Length of a short key in bytes.
const SHORT_KEY_SIZE: usize = 16;

/// Index of the low counter word.
const COUNTER_LO: usize = 12;

/// Index of the high counter word.
const COUNTER_HI: usize = 13;

/// Index of the first nonce word.
const NONCE_INDEX: usize = 14;

/// The 16-word ChaCha input block.
///
/// Layout: `cccc kkkk kkkk bbnn` (constants, key, block counter, nonce).
#[derive(Clone, Copy, Default)]
pub(crate) struct State {
    pub(crate) words: [u32; STATE_WORDS],
}

#[inline(always)]
fn load_words(dst: &mut [u32], src: &[u8]) {
    for (val, chunk) in dst.iter_mut().zip(src.chunks_exact(4)) {
        *val = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

impl State {
    /// State for a 32-byte key and 8-byte nonce whose lengths are fixed by
    /// the caller's types, with the counter at zero.
    #[cfg(any(feature = "cipher", feature = "rng"))]
    pub(crate) fn from_fixed(key: &[u8], nonce: &[u8]) -> Self {
        debug_assert_eq!(key.len(), KEY_SIZE);
        debug_assert_eq!(nonce.len(), NONCE_SIZE);

        let mut state = Self::default();
        state.words[..4].copy_from_slice(&SIGMA);
        load_words(&mut state.words[4..12], key);
        load_words(&mut state.words[NONCE_INDEX..], nonce);
        state
    }

    /// Load a 16- or 32-byte key and the constants matching its length.
    ///
    /// A 16-byte key fills both halves of the key words.
    pub(crate) fn set_key(&mut self, key: &[u8]) -> Result<(), Error> {
        let (constants, hi) = match key.len() {
            KEY_SIZE => (SIGMA, &key[SHORT_KEY_SIZE..]),
            SHORT_KEY_SIZE => (TAU, key),
            len => return Err(Error::InvalidKeyLength(len)),
        };

        self.words[..4].copy_from_slice(&constants);
        load_words(&mut self.words[4..8], &key[..SHORT_KEY_SIZE]);
        load_words(&mut self.words[8..12], hi);
        Ok(())
    }

    /// Load an 8-byte nonce and reset the block counter.
    pub(crate) fn set_nonce(&mut self, nonce: &[u8]) -> Result<(), Error> {
        if nonce.len() != NONCE_SIZE {
            return Err(Error::InvalidNonceLength(nonce.len()));
        }

        load_words(&mut self.words[NONCE_INDEX..], nonce);
        self.set_counter(0);
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn counter(&self) -> u64 {
        u64::from(self.words[COUNTER_LO]) | (u64::from(self.words[COUNTER_HI]) << 32)
    }

    #[inline(always)]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn set_counter(&mut self, block: u64) {
        self.words[COUNTER_LO] = block as u32;
        self.words[COUNTER_HI] = (block >> 32) as u32;
    }

    /// Advance the counter by one block, carrying into the high word.
    ///
    /// Returns `true` when the high word wrapped back to zero, i.e. the
    /// 64-bit block counter has cycled.
    #[inline(always)]
    pub(crate) fn increment(&mut self) -> bool {
        let (lo, carry) = self.words[COUNTER_LO].overflowing_add(1);
        let (hi, wrapped) = self.words[COUNTER_HI].overflowing_add(u32::from(carry));
        self.words[COUNTER_LO] = lo;
        self.words[COUNTER_HI] = hi;
        wrapped
    }
}

#[cfg(feature = "zeroize")]
impl Zeroize for State {
    fn zeroize(&mut self) {
        self.words.zeroize();
    }
}
