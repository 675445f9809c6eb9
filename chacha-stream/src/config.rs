//! Parallel processing tuning.
//!
//! None of these settings affect the bytes produced, only how long it takes
//! to produce them.

use crate::BLOCK_SIZE;

/// Default number of blocks assigned to one worker (25,600 bytes).
pub const DEFAULT_BLOCKS_PER_CHUNK: usize = 400;

/// Default cap on simultaneously running chunk workers.
pub const DEFAULT_MAX_WORKERS: usize = 128;

/// Tuning controls for the parallel chunk scheduler.
///
/// A request is split across workers only when, after any partially consumed
/// block has been drained, at least [`Tuning::parallel_threshold`] bytes
/// remain. Without the `parallel` feature these settings are accepted and
/// ignored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tuning {
    blocks_per_chunk: usize,
    max_workers: usize,
    parallel: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            blocks_per_chunk: DEFAULT_BLOCKS_PER_CHUNK,
            max_workers: DEFAULT_MAX_WORKERS,
            parallel: true,
        }
    }
}

impl Tuning {
    /// Default tuning: parallel processing enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tuning with parallel processing disabled.
    #[must_use]
    pub fn sequential() -> Self {
        Self::default().with_parallel(false)
    }

    /// Set the number of 64-byte blocks per chunk; `0` selects the default.
    #[must_use]
    pub fn with_blocks_per_chunk(mut self, blocks: usize) -> Self {
        self.blocks_per_chunk = if blocks == 0 {
            DEFAULT_BLOCKS_PER_CHUNK
        } else {
            blocks
        };
        self
    }

    /// Set the maximum number of concurrent chunk workers; `0` selects the default.
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = if workers == 0 {
            DEFAULT_MAX_WORKERS
        } else {
            workers
        };
        self
    }

    /// Enable or disable parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Blocks per chunk.
    #[must_use]
    pub fn blocks_per_chunk(&self) -> usize {
        self.blocks_per_chunk
    }

    /// Maximum number of concurrent chunk workers.
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Whether parallel processing is enabled.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Bytes per chunk.
    #[must_use]
    pub fn chunk_bytes(&self) -> usize {
        self.blocks_per_chunk.saturating_mul(BLOCK_SIZE)
    }

    /// Smallest block-aligned request that is split across workers.
    #[must_use]
    pub fn parallel_threshold(&self) -> usize {
        self.chunk_bytes().saturating_mul(2)
    }
}
