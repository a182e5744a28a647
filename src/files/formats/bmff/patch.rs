//! Chunk offset table location and patching
//!
//! The `moov` box is held in memory and scanned iteratively. Containers on the
//! path to the sample tables (`trak`, `mdia`, `minf`, `stbl`) are descended
//! into by reading the next header right after theirs; every other box is
//! skipped whole. `stco` and `co64` boxes are yielded as patch targets.
//!
//! Patching copies the `moov` bytes through unchanged except for the entries of
//! each offset table, which are shifted by the layout delta and re-encoded at
//! their original width.

use super::{
    read_box, read_u32, same_type, type_name, Atom, BoxHeader, FourCc, ANCESTOR_BOXES, CO64_BOX,
    MOOV_BOX, STCO_BOX,
};
use crate::core::error::{FastStartError, FastStartResult};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Chunk offset table encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// `stco`: 32-bit offsets
    Stco,
    /// `co64`: 64-bit offsets
    Co64,
}

impl TableKind {
    /// Classify a box type as an offset table (case-insensitive)
    pub fn from_type(box_type: &FourCc) -> Option<Self> {
        if same_type(box_type, STCO_BOX) {
            Some(Self::Stco)
        } else if same_type(box_type, CO64_BOX) {
            Some(Self::Co64)
        } else {
            None
        }
    }

    /// Width of one entry in bytes
    pub fn entry_width(self) -> usize {
        match self {
            Self::Stco => 4,
            Self::Co64 => 8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Stco => "stco",
            Self::Co64 => "co64",
        }
    }
}

/// A chunk offset table found inside `moov`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTable {
    /// Entry encoding
    pub kind: TableKind,
    /// Number of entries
    pub entry_count: u32,
    /// Position of the first entry within the `moov` bytes
    pub entries_start: usize,
}

impl OffsetTable {
    /// Position one past the last entry within the `moov` bytes
    pub fn entries_end(&self) -> usize {
        self.entries_start + self.entry_count as usize * self.kind.entry_width()
    }
}

/// Lazy scan over the offset tables of a `moov` box
///
/// Yields tables in byte order. After an error the iterator is exhausted.
pub struct TableLocator<'a> {
    cursor: Cursor<&'a [u8]>,
    finished: bool,
}

impl<'a> TableLocator<'a> {
    /// Start a scan over a complete `moov` box, header included
    pub fn new(moov: &'a [u8]) -> FastStartResult<Self> {
        let mut cursor = Cursor::new(moov);
        let header = read_box(&mut cursor)?;
        if !header.is(MOOV_BOX) {
            return Err(FastStartError::format(format!(
                "expected moov box, found {}",
                type_name(&header.box_type)
            )));
        }
        Ok(Self {
            cursor,
            finished: false,
        })
    }

    fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    fn next_table(&mut self) -> FastStartResult<Option<OffsetTable>> {
        while self.cursor.position() < self.len() {
            let box_start = self.cursor.position();
            let header = read_box(&mut self.cursor)?;

            if let Some(kind) = TableKind::from_type(&header.box_type) {
                return self.read_table(kind, box_start, &header).map(Some);
            }

            if ANCESTOR_BOXES.iter().any(|ancestor| header.is(ancestor)) {
                continue;
            }

            let end = self.box_end(box_start, &header)?;
            self.cursor.set_position(end);
        }

        Ok(None)
    }

    fn box_end(&self, box_start: u64, header: &BoxHeader) -> FastStartResult<u64> {
        // size 0: box runs to the end of moov
        if header.size == 0 {
            return Ok(self.len());
        }
        if header.size < header.header_len {
            return Err(FastStartError::format(format!(
                "{} box size {} is smaller than its header",
                type_name(&header.box_type),
                header.size
            )));
        }
        match box_start.checked_add(header.size) {
            Some(end) if end <= self.len() => Ok(end),
            _ => Err(FastStartError::format(format!(
                "{} box at {} overruns moov",
                type_name(&header.box_type),
                box_start
            ))),
        }
    }

    fn read_table(
        &mut self,
        kind: TableKind,
        box_start: u64,
        header: &BoxHeader,
    ) -> FastStartResult<OffsetTable> {
        let end = self.box_end(box_start, header)?;
        let truncated = || FastStartError::format(format!("truncated {} box", kind.name()));

        if end - self.cursor.position() < 8 {
            return Err(truncated());
        }
        // version + flags
        self.cursor.set_position(self.cursor.position() + 4);
        let entry_count = read_u32(&mut self.cursor).map_err(|_| truncated())?;

        let entries_start = self.cursor.position();
        let entries_len = entry_count as u64 * kind.entry_width() as u64;
        if entries_len > end - entries_start {
            return Err(FastStartError::format(format!(
                "{} box declares {} entries but holds {} bytes",
                kind.name(),
                entry_count,
                end - entries_start
            )));
        }

        self.cursor.set_position(end);
        Ok(OffsetTable {
            kind,
            entry_count,
            entries_start: entries_start as usize,
        })
    }
}

impl Iterator for TableLocator<'_> {
    type Item = FastStartResult<OffsetTable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_table() {
            Ok(Some(table)) => Some(Ok(table)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// A `moov` box with its chunk offsets shifted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedMoov {
    /// Complete `moov` box bytes, same length as the input
    pub data: Vec<u8>,
    /// Number of `stco`/`co64` tables rewritten
    pub tables_patched: usize,
}

/// Shift every chunk offset in a `moov` box by `delta`
pub fn patch_moov(moov: &[u8], delta: i64) -> FastStartResult<PatchedMoov> {
    let mut data = Vec::with_capacity(moov.len());
    // Bytes of `moov` already copied to `data`
    let mut copied = 0usize;
    let mut tables_patched = 0usize;

    for table in TableLocator::new(moov)? {
        let table = table?;
        data.extend_from_slice(&moov[copied..table.entries_start]);

        let entries = &moov[table.entries_start..table.entries_end()];
        let mut wrapped = 0usize;
        match table.kind {
            TableKind::Stco => {
                for raw in entries.chunks_exact(4) {
                    let offset = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                    let (shifted, overflowed) = shift_stco(offset, delta);
                    if overflowed {
                        wrapped += 1;
                    }
                    data.extend_from_slice(&shifted.to_be_bytes());
                }
            }
            TableKind::Co64 => {
                for raw in entries.chunks_exact(8) {
                    let offset = u64::from_be_bytes([
                        raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
                    ]);
                    data.extend_from_slice(&shift_co64(offset, delta).to_be_bytes());
                }
            }
        }

        if wrapped > 0 {
            warn!(
                entries = wrapped,
                "stco offsets do not fit in 32 bits after shifting"
            );
        }
        debug!(
            table = table.kind.name(),
            entries = table.entry_count,
            delta,
            "patched chunk offset table"
        );

        copied = table.entries_end();
        tables_patched += 1;
    }

    data.extend_from_slice(&moov[copied..]);

    Ok(PatchedMoov {
        data,
        tables_patched,
    })
}

/// Shift a 32-bit offset, wrapping modulo 2^32. The flag is set when the
/// shifted value did not fit.
pub fn shift_stco(offset: u32, delta: i64) -> (u32, bool) {
    let shifted = i64::from(offset).wrapping_add(delta);
    (shifted as u32, u32::try_from(shifted).is_err())
}

/// Shift a 64-bit offset, wrapping modulo 2^64
pub fn shift_co64(offset: u64, delta: i64) -> u64 {
    offset.wrapping_add_signed(delta)
}

/// Read the complete `moov` box into memory
///
/// A `moov` declared with size `0` gets its resolved size written into its
/// header, since it will no longer be the last atom of the file.
pub fn read_moov<R: Read + Seek>(reader: &mut R, moov: &Atom) -> FastStartResult<Vec<u8>> {
    let len = usize::try_from(moov.size).map_err(|_| {
        FastStartError::format(format!("moov of {} bytes does not fit in memory", moov.size))
    })?;

    reader.seek(SeekFrom::Start(moov.start))?;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    if data.len() >= 8 && data[..4] == [0, 0, 0, 0] {
        let size = u32::try_from(len)
            .map_err(|_| FastStartError::format("open-ended moov is too large to relocate"))?;
        data[..4].copy_from_slice(&size.to_be_bytes());
    }

    Ok(data)
}
