//! File-level fast-start support
//!
//! This module provides the path- and stream-based rewrite API together with
//! the BMFF primitives it is built on.

pub mod file;
pub mod formats;
pub mod options;

pub use file::{process, FastStartFile, Outcome};
pub use formats::bmff::{Atom, AtomIndex};
pub use options::FastStartOptions;
