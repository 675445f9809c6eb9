//! `rand_core` integration: the keystream as a cryptographic random number
//! generator.

use rand_core::{SeedableRng, TryCryptoRng, TryRngCore};

use crate::{ChaCha, Error, NONCE_SIZE, Status, Tuning, state::State};

impl SeedableRng for ChaCha {
    type Seed = [u8; 32];

    /// 20-round generator keyed by `seed` with an all-zero nonce.
    #[inline]
    fn from_seed(seed: Self::Seed) -> Self {
        ChaCha::from_state(State::from_fixed(&seed, &[0u8; NONCE_SIZE]), Tuning::default())
    }
}

impl TryRngCore for ChaCha {
    type Error = Error;

    #[inline]
    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        let mut bytes = [0u8; 4];
        self.try_fill_bytes(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    #[inline]
    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        let mut bytes = [0u8; 8];
        self.try_fill_bytes(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Fails if the keystream runs out before `dest` is full.
    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Self::Error> {
        match self.read(dest)? {
            Status::Exhausted(n) if n < dest.len() => Err(Error::UseAfterExhaustion),
            _ => Ok(()),
        }
    }
}

impl TryCryptoRng for ChaCha {}
