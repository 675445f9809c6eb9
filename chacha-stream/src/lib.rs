//! Implementation of the [ChaCha] family of stream ciphers in its original
//! construction: 64-bit nonce, 64-bit block counter, 16- or 32-byte key and
//! 8, 12 or 20 rounds.
//!
//! Long messages are split into chunks of blocks that are computed
//! concurrently on a bounded worker pool (`parallel` feature, on by default).
//! The output is bit-identical to sequential processing of the same key,
//! nonce, round count and counter range.
//!
//! # ⚠️ Security Warning: Hazmat!
//!
//! This crate does not ensure ciphertexts are authentic! Thus ciphertext integrity
//! is not verified, which can lead to serious vulnerabilities!
//!
//! Nonce reuse under the same key is not detected. Never encrypt two messages
//! with the same key and nonce.
//!
//! USE AT YOUR OWN RISK!
//!
//! # Diagram
//!
//! This diagram illustrates the ChaCha quarter round function.
//! Each round consists of four quarter-rounds:
//!
//! <img src="https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/img/stream-ciphers/chacha20.png" width="300px">
//!
//! Legend:
//!
//! - ⊞ add
//! - ‹‹‹ rotate
//! - ⊕ xor
//!
//! # Example
//! ```
//! use chacha_stream::{ChaCha, Status};
//! use hex_literal::hex;
//!
//! let key = [0u8; 32];
//! let nonce = [0u8; 8];
//! let plaintext = *b"hello world";
//!
//! let mut cipher = ChaCha::new(&key, &nonce)?;
//! let mut ciphertext = [0u8; 11];
//! assert_eq!(cipher.encrypt(&plaintext, &mut ciphertext)?, Status::Complete(11));
//! assert_eq!(ciphertext, hex!("1edd8cc1 cfd14aff 32310e"));
//!
//! // decrypt by applying the same keystream again
//! cipher.seek(0);
//! let mut buffer = ciphertext;
//! cipher.apply_keystream(&mut buffer)?;
//! assert_eq!(buffer, plaintext);
//!
//! // a message may be processed in pieces
//! cipher.seek(0);
//! for chunk in buffer.chunks_mut(3) {
//!     cipher.apply_keystream(chunk)?;
//! }
//! assert_eq!(buffer, ciphertext);
//! # Ok::<(), chacha_stream::Error>(())
//! ```
//!
//! [ChaCha]: https://cr.yp.to/chacha.html

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg"
)]
#![warn(missing_docs, rust_2018_idioms, trivial_casts, unused_qualifications)]

#[cfg(any(feature = "std", test))]
extern crate std;

#[cfg(feature = "std")]
extern crate alloc;

#[cfg(feature = "cipher")]
pub use cipher;

#[cfg(feature = "rng")]
pub use rand_core;

mod block;
mod chacha;
mod config;
mod errors;
#[cfg(feature = "parallel")]
mod parallel;
#[cfg(feature = "rng")]
mod rng;
mod state;
mod stream;

pub use chacha::ChaCha;
pub use config::{DEFAULT_BLOCKS_PER_CHUNK, DEFAULT_MAX_WORKERS, Tuning};
pub use errors::{Error, Status};

/// Size of a ChaCha block in bytes
pub const BLOCK_SIZE: usize = 64;

/// Size of a full-length key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of a nonce in bytes
pub const NONCE_SIZE: usize = 8;

/// Number of 32-bit words in the ChaCha state
const STATE_WORDS: usize = 16;

/// Number of rounds performed by the block function.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rounds {
    /// ChaCha8 (reduced-round, *not recommended*)
    R8,
    /// ChaCha12 (reduced-round)
    R12,
    /// ChaCha20 (**recommended**)
    #[default]
    R20,
}

impl Rounds {
    /// Number of rounds.
    #[must_use]
    pub const fn count(self) -> u32 {
        match self {
            Self::R8 => 8,
            Self::R12 => 12,
            Self::R20 => 20,
        }
    }

    /// Number of double rounds (a column round plus a diagonal round).
    #[inline(always)]
    pub(crate) const fn double_rounds(self) -> u32 {
        self.count() / 2
    }
}

impl TryFrom<u32> for Rounds {
    type Error = Error;

    fn try_from(rounds: u32) -> Result<Self, Error> {
        match rounds {
            8 => Ok(Self::R8),
            12 => Ok(Self::R12),
            20 => Ok(Self::R20),
            other => Err(Error::InvalidRoundCount(other)),
        }
    }
}

impl From<Rounds> for u32 {
    fn from(rounds: Rounds) -> u32 {
        rounds.count()
    }
}

#[inline(always)]
pub(crate) fn xor(buf: &mut [u8], key: &[u8]) {
    debug_assert_eq!(buf.len(), key.len());
    for (a, b) in buf.iter_mut().zip(key) {
        *a ^= *b;
    }
}
