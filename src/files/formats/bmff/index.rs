//! Top-level atom index
//!
//! Walks the top level of a QuickTime/MP4 file once and records every atom's
//! type, size and absolute start offset in file order.
//!
//! Indexing is tolerant: a header that cannot be read, or a size smaller than
//! its own header, ends the walk and the atoms parsed so far are kept.
//! Validation of the required `moov` and `mdat` atoms runs on that partial
//! result.

use super::{read_box, same_type, type_name, FourCc, MDAT_BOX, MOOV_BOX};
use crate::core::error::{FastStartError, FastStartResult};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// A top-level atom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom {
    /// Box type (4-byte FourCC)
    pub box_type: FourCc,
    /// Full size including header. Atoms declared with size `0` are resolved
    /// to the distance from their start to the end of the stream.
    pub size: u64,
    /// Absolute offset of the box header
    pub start: u64,
}

impl Atom {
    /// Whether this atom has the given type (case-insensitive)
    pub fn is(&self, box_type: &FourCc) -> bool {
        same_type(&self.box_type, box_type)
    }

    /// Offset one past the last byte of the atom
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }
}

/// Ordered list of top-level atoms, containing exactly one `moov` and one `mdat`
///
/// With the `serde` feature the index serializes as a plain list of atoms;
/// deserializing runs the same validation as [`AtomIndex::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Atom>", into = "Vec<Atom>"))]
pub struct AtomIndex {
    atoms: Vec<Atom>,
}

impl AtomIndex {
    /// Validate a list of atoms and wrap it as an index
    pub fn new(atoms: Vec<Atom>) -> FastStartResult<Self> {
        for required in [MOOV_BOX, MDAT_BOX] {
            match atoms.iter().filter(|atom| atom.is(required)).count() {
                0 => {
                    return Err(FastStartError::format(format!(
                        "missing {}",
                        type_name(required)
                    )))
                }
                1 => {}
                n => {
                    return Err(FastStartError::format(format!(
                        "expected one {} atom, found {}",
                        type_name(required),
                        n
                    )))
                }
            }
        }
        Ok(Self { atoms })
    }

    /// All atoms in file order
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Iterate over atoms in file order
    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    /// First atom of the given type
    pub fn find(&self, box_type: &FourCc) -> Option<&Atom> {
        self.atoms.iter().find(|atom| atom.is(box_type))
    }

    /// The `moov` atom
    pub fn moov(&self) -> &Atom {
        // Presence is checked in `new`
        &self.atoms[self.position(MOOV_BOX)]
    }

    /// The `mdat` atom
    pub fn mdat(&self) -> &Atom {
        &self.atoms[self.position(MDAT_BOX)]
    }

    /// Whether `moov` already precedes `mdat`
    pub fn is_fast_start(&self) -> bool {
        self.moov().start < self.mdat().start
    }

    fn position(&self, box_type: &FourCc) -> usize {
        self.atoms
            .iter()
            .position(|atom| atom.is(box_type))
            .unwrap_or_default()
    }
}

impl TryFrom<Vec<Atom>> for AtomIndex {
    type Error = FastStartError;

    fn try_from(atoms: Vec<Atom>) -> FastStartResult<Self> {
        Self::new(atoms)
    }
}

impl From<AtomIndex> for Vec<Atom> {
    fn from(index: AtomIndex) -> Self {
        index.atoms
    }
}

impl<'a> IntoIterator for &'a AtomIndex {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}

/// Build the top-level atom index of a stream, starting at offset 0
pub fn build_index<R: Read + Seek>(reader: &mut R) -> FastStartResult<AtomIndex> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let atoms = walk_top_level(reader, stream_len);
    AtomIndex::new(atoms)
}

fn walk_top_level<R: Read + Seek>(reader: &mut R, stream_len: u64) -> Vec<Atom> {
    let mut atoms = Vec::new();
    let mut pos = 0u64;

    while pos < stream_len {
        let header = match read_box(reader) {
            Ok(header) => header,
            Err(e) => {
                warn!(offset = pos, "stopping atom index: {}", e);
                break;
            }
        };

        if header.size == 0 {
            let atom = Atom {
                box_type: header.box_type,
                size: stream_len - pos,
                start: pos,
            };
            debug!(atom = %type_name(&atom.box_type), start = atom.start, size = atom.size, "indexed open-ended atom");
            atoms.push(atom);
            break;
        }

        if header.size < header.header_len {
            warn!(
                offset = pos,
                size = header.size,
                "stopping atom index: size smaller than header"
            );
            break;
        }

        let atom = Atom {
            box_type: header.box_type,
            size: header.size,
            start: pos,
        };
        debug!(atom = %type_name(&atom.box_type), start = atom.start, size = atom.size, "indexed atom");
        atoms.push(atom);

        pos = atom.end();
        if pos >= stream_len {
            break;
        }
        if let Err(e) = reader.seek(SeekFrom::Start(pos)) {
            warn!(offset = pos, "stopping atom index: {}", e);
            break;
        }
    }

    atoms
}
