//! # faststart
//!
//! Pure Rust "fast start" rewriter for QuickTime/MP4 files.
//!
//! Progressive playback needs the `moov` metadata box before the `mdat` media
//! box. This crate rewrites a file into that order: it indexes the top-level
//! atoms, shifts every chunk offset in the `stco`/`co64` tables of `moov` by
//! the distance the media data moves, and streams the atoms back out as
//! `ftyp`, `moov`, then everything else in original order. `free` atoms are
//! dropped.
//!
//! ## Example
//!
//! ```rust,no_run
//! use faststart::{FastStartFile, FastStartOptions};
//!
//! let rewriter = FastStartFile::with_options(FastStartOptions::default().block_size(64 * 1024));
//! let playable = rewriter.process("input.mp4", "output.mp4")?;
//! println!("fast-start file: {}", playable.display());
//! # Ok::<(), faststart::FastStartError>(())
//! ```
//!
//! Files that already have `moov` in front and no `free` space to reclaim are
//! left alone; [`process`] then returns the input path.

pub mod core;
pub mod files;

pub use crate::core::{FastStartError, FastStartResult};
pub use files::{process, Atom, AtomIndex, FastStartFile, FastStartOptions, Outcome};
