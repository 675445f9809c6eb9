//! The ChaCha block function.
//!
//! Defined in "ChaCha, a variant of Salsa20" (D. J. Bernstein), and for the
//! 20-round variant in RFC 8439 Section 2.3:
//! <https://tools.ietf.org/html/rfc8439#section-2.3>

use crate::{BLOCK_SIZE, Rounds, STATE_WORDS};

/// Output of a single invocation of the block function.
pub(crate) type Block = [u8; BLOCK_SIZE];

/// The ChaCha quarter round function
#[inline(always)]
pub(crate) fn quarter_round(a: usize, b: usize, c: usize, d: usize, state: &mut [u32; STATE_WORDS]) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] ^= state[a];
    state[d] = state[d].rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] ^= state[c];
    state[b] = state[b].rotate_left(7);
}

/// Run `rounds` rounds over a copy of `state` and add the input back in.
#[inline(always)]
fn run_rounds(state: &[u32; STATE_WORDS], rounds: Rounds) -> [u32; STATE_WORDS] {
    let mut res = *state;

    for _ in 0..rounds.double_rounds() {
        // column rounds
        quarter_round(0, 4, 8, 12, &mut res);
        quarter_round(1, 5, 9, 13, &mut res);
        quarter_round(2, 6, 10, 14, &mut res);
        quarter_round(3, 7, 11, 15, &mut res);

        // diagonal rounds
        quarter_round(0, 5, 10, 15, &mut res);
        quarter_round(1, 6, 11, 12, &mut res);
        quarter_round(2, 7, 8, 13, &mut res);
        quarter_round(3, 4, 9, 14, &mut res);
    }

    for (s1, s0) in res.iter_mut().zip(state.iter()) {
        *s1 = s1.wrapping_add(*s0);
    }
    res
}

/// Compute the keystream block for `state`, serialized little-endian.
///
/// The caller's state is only read; advancing the counter is the caller's job.
#[inline]
pub(crate) fn generate(state: &[u32; STATE_WORDS], rounds: Rounds) -> Block {
    let res = run_rounds(state, rounds);

    let mut block = [0u8; BLOCK_SIZE];
    for (chunk, val) in block.chunks_exact_mut(4).zip(res.iter()) {
        chunk.copy_from_slice(&val.to_le_bytes());
    }
    block
}
