//! Output file reassembly
//!
//! Output order:
//! 1. `ftyp`, copied from the input
//! 2. the patched `moov`
//! 3. every other top-level atom in input order, except `free`
//!
//! Atoms other than `moov` are streamed through a fixed-size block buffer.

use super::{copy_bytes, type_name, Atom, AtomIndex, FREE_BOX, FTYP_BOX, MOOV_BOX};
use crate::core::error::FastStartResult;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Write the fast-start layout of `index` to `writer`
///
/// Returns the number of bytes written.
pub fn assemble<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
    index: &AtomIndex,
    moov: &[u8],
    block_size: usize,
) -> FastStartResult<u64> {
    let mut written = 0u64;

    for atom in index.iter().filter(|atom| atom.is(FTYP_BOX)) {
        written += copy_atom(reader, writer, atom, block_size)?;
    }

    debug!(size = moov.len(), "writing moov");
    writer.write_all(moov)?;
    written += moov.len() as u64;

    for atom in index.iter().filter(|atom| is_relocated_tail(atom)) {
        written += copy_atom(reader, writer, atom, block_size)?;
    }

    writer.flush()?;
    Ok(written)
}

fn is_relocated_tail(atom: &Atom) -> bool {
    !(atom.is(FTYP_BOX) || atom.is(MOOV_BOX) || atom.is(FREE_BOX))
}

fn copy_atom<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
    atom: &Atom,
    block_size: usize,
) -> FastStartResult<u64> {
    debug!(atom = %type_name(&atom.box_type), start = atom.start, size = atom.size, "copying atom");
    reader.seek(SeekFrom::Start(atom.start))?;
    copy_bytes(reader, writer, atom.size, block_size)?;
    Ok(atom.size)
}
