//! Fast-start file API
//!
//! This module provides the high-level entry points: a path-based
//! [`FastStartFile::process`] that owns the input and output file handles, and
//! a stream-based [`FastStartFile::rewrite`] for any seekable source.

use crate::core::error::FastStartResult;
use crate::files::formats::bmff::{
    assemble, build_index, patch_moov, read_moov, AtomIndex, Layout, PatchedMoov,
};
use crate::files::options::FastStartOptions;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    /// `moov` already precedes `mdat` with no `free` atom before `mdat`;
    /// nothing was written
    Unchanged,
    /// The file was rewritten in fast-start order
    Rewritten {
        /// Shift applied to every chunk offset
        delta: i64,
        /// Number of `stco`/`co64` tables patched
        tables_patched: usize,
        /// Total bytes written to the output
        bytes_written: u64,
    },
}

impl Outcome {
    /// Whether output was produced
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten { .. })
    }
}

/// High-level API for fast-start rewrites
///
/// # Example
///
/// ```rust,no_run
/// use faststart::FastStartFile;
///
/// let result = FastStartFile::new().process("movie.mov", "movie.faststart.mov")?;
/// if result.as_path() == std::path::Path::new("movie.mov") {
///     println!("already fast-start");
/// }
/// # Ok::<(), faststart::FastStartError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FastStartFile {
    options: FastStartOptions,
}

/// Everything computed before the first output byte is written
struct Prepared {
    index: AtomIndex,
    delta: i64,
    moov: PatchedMoov,
}

impl FastStartFile {
    /// Create a rewriter with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rewriter with the given options
    pub fn with_options(options: FastStartOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &FastStartOptions {
        &self.options
    }

    /// Build and validate the top-level atom index of a stream
    pub fn index<R: Read + Seek>(reader: &mut R) -> FastStartResult<AtomIndex> {
        build_index(reader)
    }

    /// Rewrite `input` into `output` with `moov` moved before `mdat`.
    ///
    /// Returns the path of the fast-start file: `output` after a rewrite, or
    /// `input` itself when the file needed no change (no output is created in
    /// that case). An existing `output` is replaced.
    ///
    /// # Errors
    ///
    /// * [`FastStartError::Format`](crate::FastStartError::Format) if `moov` or
    ///   `mdat` is missing or `moov` is malformed; no output is created.
    /// * [`FastStartError::Io`](crate::FastStartError::Io) on any read or write
    ///   failure, or when `input` and `output` are the same file. Unless
    ///   [`FastStartOptions::keep_partial_output`] is set, a partially written
    ///   output is removed.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> FastStartResult<PathBuf> {
        let input = input.as_ref();
        let output = output.as_ref();

        if same_file(input, output) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("output {} is the input file", output.display()),
            )
            .into());
        }

        let mut reader = BufReader::new(File::open(input)?);
        let Some(prepared) = Self::prepare(&mut reader)? else {
            info!(input = %input.display(), "file is already fast-start");
            return Ok(input.to_path_buf());
        };

        let mut writer = BufWriter::new(File::create(output)?);
        let result = self.write(&mut reader, &mut writer, prepared);
        drop(writer);

        match result {
            Ok(outcome) => {
                info!(input = %input.display(), output = %output.display(), ?outcome, "fast-start rewrite complete");
                Ok(output.to_path_buf())
            }
            Err(e) => {
                if !self.options.keep_partial_output {
                    if let Err(rm) = fs::remove_file(output) {
                        warn!(output = %output.display(), "failed to remove partial output: {}", rm);
                    }
                }
                Err(e)
            }
        }
    }

    /// Rewrite a stream with `moov` moved before `mdat`.
    ///
    /// Nothing is written to `writer` when the outcome is
    /// [`Outcome::Unchanged`].
    pub fn rewrite<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
    ) -> FastStartResult<Outcome> {
        match Self::prepare(reader)? {
            Some(prepared) => self.write(reader, writer, prepared),
            None => Ok(Outcome::Unchanged),
        }
    }

    fn prepare<R: Read + Seek>(reader: &mut R) -> FastStartResult<Option<Prepared>> {
        let index = build_index(reader)?;
        let Some(layout) = Layout::from_index(&index)? else {
            return Ok(None);
        };

        let moov = read_moov(reader, &layout.moov)?;
        let moov = patch_moov(&moov, layout.delta)?;

        Ok(Some(Prepared {
            index,
            delta: layout.delta,
            moov,
        }))
    }

    fn write<R: Read + Seek, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        prepared: Prepared,
    ) -> FastStartResult<Outcome> {
        let bytes_written = assemble(
            reader,
            writer,
            &prepared.index,
            &prepared.moov.data,
            self.options.effective_block_size(),
        )?;

        Ok(Outcome::Rewritten {
            delta: prepared.delta,
            tables_patched: prepared.moov.tables_patched,
            bytes_written,
        })
    }
}

/// Rewrite `input` into `output` with default options
///
/// See [`FastStartFile::process`].
pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> FastStartResult<PathBuf> {
    FastStartFile::new().process(input, output)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
