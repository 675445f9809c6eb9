//! Generic stream and byte-source trait implementations.

#[cfg(feature = "cipher")]
mod stream_cipher {
    use core::cmp;

    use cfg_if::cfg_if;
    use cipher::{
        Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser, StreamCipher, StreamCipherError,
        consts::{U8, U32},
        inout::InOutBuf,
    };

    use crate::{ChaCha, Tuning, state::State};

    impl KeySizeUser for ChaCha {
        type KeySize = U32;
    }

    impl IvSizeUser for ChaCha {
        type IvSize = U8;
    }

    impl KeyIvInit for ChaCha {
        #[inline]
        fn new(key: &Key<Self>, iv: &Iv<Self>) -> Self {
            ChaCha::from_state(State::from_fixed(key, iv), Tuning::default())
        }
    }

    impl StreamCipher for ChaCha {
        /// Fails without modifying `buf` if the keystream cannot cover all of it.
        fn try_apply_keystream_inout(
            &mut self,
            buf: InOutBuf<'_, '_, u8>,
        ) -> Result<(), StreamCipherError> {
            if buf.len() as u128 > self.remaining() {
                return Err(StreamCipherError);
            }

            cfg_if! {
                if #[cfg(feature = "std")] {
                    // large enough for a full round of chunk workers
                    let tuning = self.tuning();
                    let size = cmp::max(
                        tuning.parallel_threshold(),
                        tuning.chunk_bytes().saturating_mul(tuning.max_workers()),
                    );
                    let mut scratch = alloc::vec![0u8; cmp::min(buf.len(), size)];
                } else {
                    let mut scratch = [0u8; 16 * crate::BLOCK_SIZE];
                }
            }

            let mut buf = buf;
            while buf.len() != 0 {
                let n = cmp::min(buf.len(), scratch.len());
                let (mut head, tail) = buf.split_at(n);
                let keystream = &mut scratch[..n];
                self.read(keystream).map_err(|_| StreamCipherError)?;
                head.xor_in2out(keystream);
                buf = tail;
            }
            Ok(())
        }
    }
}

#[cfg(feature = "std")]
impl std::io::Read for crate::ChaCha {
    /// Fill `buf` with keystream. Once the keystream has run out every read
    /// returns `Ok(0)` until the context is reseeked.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match crate::ChaCha::read(self, buf) {
            Ok(status) => Ok(status.len()),
            Err(crate::Error::UseAfterExhaustion) => Ok(0),
            Err(err) => Err(std::io::Error::other(err)),
        }
    }
}
