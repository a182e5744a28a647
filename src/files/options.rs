//! Options for fast-start rewrites

use crate::files::formats::bmff::DEFAULT_BLOCK_SIZE;

/// Smallest block size accepted for streaming copies
pub const MIN_BLOCK_SIZE: usize = 512;

/// Options for fast-start rewrites.
///
/// Use the builder pattern to configure options.
///
/// # Example
///
/// ```rust,no_run
/// use faststart::{FastStartFile, FastStartOptions};
///
/// let file = FastStartFile::with_options(
///     FastStartOptions::default().block_size(64 * 1024).keep_partial_output(),
/// );
/// file.process("input.mp4", "output.mp4")?;
/// # Ok::<(), faststart::FastStartError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FastStartOptions {
    /// Size of the buffer used to stream atoms from input to output
    pub block_size: usize,
    /// Leave a partially written output file in place when a rewrite fails
    pub keep_partial_output: bool,
}

impl Default for FastStartOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            keep_partial_output: false,
        }
    }
}

impl FastStartOptions {
    /// Set the streaming copy block size.
    ///
    /// Values below [`MIN_BLOCK_SIZE`] are raised to it.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(MIN_BLOCK_SIZE);
        self
    }

    /// Keep a partially written output file when a rewrite fails.
    ///
    /// By default the output file is removed on failure.
    pub fn keep_partial_output(mut self) -> Self {
        self.keep_partial_output = true;
        self
    }

    /// Block size actually used for copying
    pub(crate) fn effective_block_size(&self) -> usize {
        self.block_size.max(MIN_BLOCK_SIZE)
    }
}
