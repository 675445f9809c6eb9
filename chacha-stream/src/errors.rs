//! Error types.
use core::fmt;

/// Errors returned by setup and keystream-producing operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Key was not 16 or 32 bytes long.
    InvalidKeyLength(usize),
    /// Nonce was not 8 bytes long.
    InvalidNonceLength(usize),
    /// Round count was not 8, 12 or 20.
    InvalidRoundCount(u32),
    /// Destination buffer is shorter than the source.
    InsufficientOutputSpace {
        /// Bytes required (source length).
        needed: usize,
        /// Bytes available in the destination.
        available: usize,
    },
    /// Keystream was requested after [`Status::Exhausted`] had already been
    /// returned.
    ///
    /// The context stays unusable until it is repositioned with
    /// [`ChaCha::seek`][crate::ChaCha::seek] or given a new nonce.
    UseAfterExhaustion,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyLength(len) => {
                write!(f, "invalid key length {len}; must be 16 or 32 bytes")
            }
            Self::InvalidNonceLength(len) => {
                write!(f, "invalid nonce length {len}; must be 8 bytes")
            }
            Self::InvalidRoundCount(rounds) => {
                write!(f, "invalid round count {rounds}; must be 8, 12 or 20")
            }
            Self::InsufficientOutputSpace { needed, available } => write!(
                f,
                "insufficient output space: {available} bytes available, {needed} needed"
            ),
            Self::UseAfterExhaustion => {
                f.write_str("keystream requested after the stream was exhausted")
            }
        }
    }
}

impl core::error::Error for Error {}

/// Successful outcome of a keystream-producing operation.
///
/// Both variants carry the number of bytes actually produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// The whole request was served.
    ///
    /// This includes a request that ends exactly on the last byte of the
    /// keystream; the following request then reports `Exhausted(0)`.
    Complete(usize),
    /// The keystream ran out before the request was served.
    ///
    /// Carries the bytes produced before the end, possibly zero. Further
    /// requests fail with [`Error::UseAfterExhaustion`] until the context is
    /// reseeked.
    Exhausted(usize),
}

impl Status {
    /// Number of bytes produced.
    #[must_use]
    pub fn len(self) -> usize {
        match self {
            Self::Complete(n) | Self::Exhausted(n) => n,
        }
    }

    /// Whether no bytes were produced.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Whether this call hit the end of the keystream.
    #[must_use]
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}
