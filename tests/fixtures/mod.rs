//! Synthetic QuickTime/MP4 files for tests
//!
//! Media data is laid out as fixed-size chunks, each filled with its own
//! marker byte, so a chunk offset can be checked by looking at the byte it
//! points to.

#![allow(dead_code)]

use faststart::files::formats::bmff::{build_index, read_moov, TableKind, TableLocator};
use std::io::Cursor;

/// Size of every media chunk
pub const CHUNK_SIZE: usize = 100;

/// Wrap a payload in a box header
pub fn boxed(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + payload.len());
    data.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    data.extend_from_slice(box_type);
    data.extend_from_slice(payload);
    data
}

/// 20-byte file type box
pub fn ftyp() -> Vec<u8> {
    boxed(b"ftyp", b"isom\0\0\x02\0isom")
}

/// Padding box of `size` bytes
pub fn free(size: usize) -> Vec<u8> {
    boxed(b"free", &vec![0u8; size - 8])
}

/// Media data box holding `chunks` marker-filled chunks
pub fn mdat(chunks: usize) -> Vec<u8> {
    mdat_sized(8 + chunks * CHUNK_SIZE)
}

/// Media data box of exactly `size` bytes; the last chunk may be short
pub fn mdat_sized(size: usize) -> Vec<u8> {
    let payload: Vec<u8> = (0..size - 8).map(|j| marker(j / CHUNK_SIZE)).collect();
    boxed(b"mdat", &payload)
}

/// Marker byte of chunk `i`
pub fn marker(i: usize) -> u8 {
    (i % 250) as u8 + 1
}

/// Absolute offsets of the chunks of an `mdat` starting at `mdat_start`
pub fn chunk_offsets(mdat_start: usize, chunks: std::ops::Range<usize>) -> Vec<u64> {
    chunks
        .map(|i| (mdat_start + 8 + i * CHUNK_SIZE) as u64)
        .collect()
}

/// Chunk offset table contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offsets {
    Stco(Vec<u32>),
    Co64(Vec<u64>),
}

impl Offsets {
    pub fn stco(offsets: &[u64]) -> Self {
        Self::Stco(offsets.iter().map(|&o| o as u32).collect())
    }

    pub fn co64(offsets: &[u64]) -> Self {
        Self::Co64(offsets.to_vec())
    }

    pub fn values(&self) -> Vec<u64> {
        match self {
            Self::Stco(offsets) => offsets.iter().map(|&o| u64::from(o)).collect(),
            Self::Co64(offsets) => offsets.clone(),
        }
    }

    fn to_box(&self) -> Vec<u8> {
        let (box_type, count, entries): (&[u8; 4], usize, Vec<u8>) = match self {
            Self::Stco(offsets) => (
                b"stco",
                offsets.len(),
                offsets.iter().flat_map(|o| o.to_be_bytes()).collect(),
            ),
            Self::Co64(offsets) => (
                b"co64",
                offsets.len(),
                offsets.iter().flat_map(|o| o.to_be_bytes()).collect(),
            ),
        };
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&(count as u32).to_be_bytes());
        payload.extend(entries);
        boxed(box_type, &payload)
    }
}

/// Re-encode a box with a 64-bit extended size header
pub fn extended(plain: &[u8]) -> Vec<u8> {
    let payload = &plain[8..];
    let mut data = Vec::with_capacity(16 + payload.len());
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&plain[4..8]);
    data.extend_from_slice(&((16 + payload.len()) as u64).to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// Mark a box as running to the end of the file (size field `0`)
pub fn open_ended(mut data: Vec<u8>) -> Vec<u8> {
    data[..4].copy_from_slice(&0u32.to_be_bytes());
    data
}

fn track(offsets: &Offsets) -> Vec<u8> {
    track_with(offsets.to_box())
}

fn track_with(table: Vec<u8>) -> Vec<u8> {
    let mut stbl = boxed(b"stsd", &[0u8; 8]);
    stbl.extend(boxed(b"stsz", &[0u8; 12]));
    stbl.extend(table);
    let mut minf = boxed(b"smhd", &[0u8; 8]);
    minf.extend(boxed(b"stbl", &stbl));
    let mut mdia = boxed(b"mdhd", &[0u8; 24]);
    mdia.extend(boxed(b"hdlr", &[0u8; 25]));
    mdia.extend(boxed(b"minf", &minf));
    let mut trak = boxed(b"tkhd", &[0u8; 84]);
    trak.extend(boxed(b"mdia", &mdia));
    boxed(b"trak", &trak)
}

/// Movie box with one track per offset table
pub fn moov(tables: &[Offsets]) -> Vec<u8> {
    let mut payload = boxed(b"mvhd", &[0u8; 100]);
    for table in tables {
        payload.extend(track(table));
    }
    boxed(b"moov", &payload)
}

/// Movie box whose offset tables use extended size headers
pub fn moov_extended_tables(tables: &[Offsets]) -> Vec<u8> {
    let mut payload = boxed(b"mvhd", &[0u8; 100]);
    for table in tables {
        payload.extend(track_with(extended(&table.to_box())));
    }
    boxed(b"moov", &payload)
}

/// Movie box padded with a `udta` box to exactly `size` bytes
pub fn moov_sized(tables: &[Offsets], size: usize) -> Vec<u8> {
    let mut payload = boxed(b"mvhd", &[0u8; 100]);
    for table in tables {
        payload.extend(track(table));
    }
    let filler = size - 8 - payload.len();
    assert!(filler >= 8, "moov too small for requested size");
    payload.extend(boxed(b"udta", &vec![0u8; filler - 8]));
    boxed(b"moov", &payload)
}

/// Top-level atom types of a file, in order
pub fn top_level_types(file: &[u8]) -> Vec<String> {
    let index = build_index(&mut Cursor::new(file)).expect("valid index");
    index
        .iter()
        .map(|atom| String::from_utf8_lossy(&atom.box_type).into_owned())
        .collect()
}

/// All chunk offset tables of a file, in `moov` order
pub fn offset_tables(file: &[u8]) -> Vec<Offsets> {
    let mut reader = Cursor::new(file);
    let index = build_index(&mut reader).expect("valid index");
    let moov = read_moov(&mut reader, index.moov()).expect("readable moov");
    TableLocator::new(&moov)
        .expect("moov header")
        .map(|table| {
            let table = table.expect("valid table");
            let entries = &moov[table.entries_start..table.entries_end()];
            match table.kind {
                TableKind::Stco => Offsets::Stco(
                    entries
                        .chunks_exact(4)
                        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                ),
                TableKind::Co64 => Offsets::Co64(
                    entries
                        .chunks_exact(8)
                        .map(|b| u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                        .collect(),
                ),
            }
        })
        .collect()
}

/// Assert every chunk offset of `file` points at the expected marker byte
pub fn assert_offsets_hit_markers(file: &[u8], first_chunks: &[usize]) {
    for (table, &first) in offset_tables(file).iter().zip(first_chunks) {
        for (i, offset) in table.values().into_iter().enumerate() {
            let offset = offset as usize;
            assert!(offset < file.len(), "offset {} past end of file", offset);
            assert_eq!(
                file[offset],
                marker(first + i),
                "chunk {} offset {} points at the wrong data",
                first + i,
                offset
            );
        }
    }
}
