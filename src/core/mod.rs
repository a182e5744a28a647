//! Core module
//!
//! Shared error types for every stage of the fast-start pipeline.

pub mod error;

pub use error::{FastStartError, FastStartResult};
