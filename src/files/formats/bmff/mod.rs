//! ISO Base Media File Format (BMFF) support
//!
//! This module provides the box-level primitives shared by every stage of the
//! fast-start rewrite:
//! - [`index`]: top-level atom indexing
//! - [`layout`]: offset delta computation
//! - [`patch`]: chunk offset table location and patching inside `moov`
//! - [`assemble`]: streaming reassembly of the output file
//!
//! BMFF Structure:
//! - Files are composed of "boxes" (also called "atoms" in QuickTime)
//! - Each box has: 4-byte size, 4-byte type, optional extended size, data
//! - All multi-byte integers are big-endian

use crate::core::error::{FastStartError, FastStartResult};
use std::borrow::Cow;
use std::io::{ErrorKind, Read, Write};

pub mod assemble;
pub mod index;
pub mod layout;
pub mod patch;

pub use assemble::assemble;
pub use index::{build_index, Atom, AtomIndex};
pub use layout::Layout;
pub use patch::{patch_moov, read_moov, OffsetTable, PatchedMoov, TableKind, TableLocator};

// ============================================================================
// Constants
// ============================================================================

/// A four-character box type code
pub type FourCc = [u8; 4];

/// ftyp box type (file type box)
pub const FTYP_BOX: &FourCc = b"ftyp";
/// moov box type (movie metadata)
pub const MOOV_BOX: &FourCc = b"moov";
/// mdat box type (media data)
pub const MDAT_BOX: &FourCc = b"mdat";
/// free box type (padding)
pub const FREE_BOX: &FourCc = b"free";

/// Containers on the path from `moov` to the sample tables
pub const ANCESTOR_BOXES: &[&FourCc] = &[b"trak", b"mdia", b"minf", b"stbl"];

/// 32-bit chunk offset table
pub const STCO_BOX: &FourCc = b"stco";
/// 64-bit chunk offset table
pub const CO64_BOX: &FourCc = b"co64";

/// Plain box header length
pub const HEADER_LEN: u64 = 8;
/// Box header length with a 64-bit extended size
pub const EXTENDED_HEADER_LEN: u64 = 16;

/// Default block size for streaming copies
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

// ============================================================================
// Types
// ============================================================================

/// BMFF box header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    /// Box size (including header). `0` means the box extends to the end of its parent.
    pub size: u64,
    /// Box type (4-byte FourCC)
    pub box_type: FourCc,
    /// Number of header bytes consumed (8 or 16)
    pub header_len: u64,
}

impl BoxHeader {
    /// Whether this box has the given type (case-insensitive)
    pub fn is(&self, box_type: &FourCc) -> bool {
        same_type(&self.box_type, box_type)
    }

    /// Get the size of the box data (excluding header)
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_len)
    }
}

/// Case-insensitive FourCC comparison
pub fn same_type(a: &FourCc, b: &FourCc) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Printable form of a FourCC for log and error messages
pub fn type_name(box_type: &FourCc) -> Cow<'_, str> {
    String::from_utf8_lossy(box_type)
}

// ============================================================================
// Reading Functions
// ============================================================================

/// Read a box header at the current position
///
/// Consumes exactly `header_len` bytes. Running out of input before the header
/// is complete is reported as a format error.
pub fn read_box<R: Read>(reader: &mut R) -> FastStartResult<BoxHeader> {
    let size = read_u32(reader).map_err(short_header)? as u64;

    let mut box_type = [0u8; 4];
    reader.read_exact(&mut box_type).map_err(short_header)?;

    // size == 1 means extended size follows
    if size == 1 {
        let size = read_u64(reader).map_err(short_header)?;
        Ok(BoxHeader {
            size,
            box_type,
            header_len: EXTENDED_HEADER_LEN,
        })
    } else {
        Ok(BoxHeader {
            size,
            box_type,
            header_len: HEADER_LEN,
        })
    }
}

fn short_header(err: std::io::Error) -> FastStartError {
    if err.kind() == ErrorKind::UnexpectedEof {
        FastStartError::format("truncated box header")
    } else {
        err.into()
    }
}

/// Read a big-endian u32
pub fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}

/// Read a big-endian u64
pub fn read_u64<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_be_bytes(bytes))
}

/// Copy exactly `count` bytes from reader to writer through a `block_size` buffer
///
/// Fails with `UnexpectedEof` if the reader ends early.
pub fn copy_bytes<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    count: u64,
    block_size: usize,
) -> std::io::Result<()> {
    let mut buffer = vec![0u8; block_size.max(1)];
    let mut remaining = count;

    while remaining > 0 {
        let to_read = remaining.min(buffer.len() as u64) as usize;
        let n = reader.read(&mut buffer[..to_read])?;
        if n == 0 {
            return Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("input ended with {} bytes left to copy", remaining),
            ));
        }
        writer.write_all(&buffer[..n])?;
        remaining -= n as u64;
    }

    Ok(())
}
