//! Offset delta computation
//!
//! Relocating `moov` ahead of `mdat` shifts the media data forward by the size
//! of `moov`; dropping `free` atoms that sat before `mdat` shifts it back. The
//! sum of both is the delta applied to every chunk offset.

use super::{Atom, AtomIndex, FREE_BOX};
use crate::core::error::{FastStartError, FastStartResult};
use tracing::debug;

/// Planned relocation of `moov`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// The `moov` atom to relocate
    pub moov: Atom,
    /// Absolute start of `mdat` in the input
    pub mdat_start: u64,
    /// Total size of the `free` atoms located before `mdat`
    pub free_before_mdat: u64,
    /// Signed shift applied to every chunk offset
    pub delta: i64,
}

impl Layout {
    /// Compute the layout for an index.
    ///
    /// Returns `Ok(None)` when `moov` already precedes `mdat` and there is no
    /// `free` atom before `mdat` to remove: the file needs no rewrite.
    pub fn from_index(index: &AtomIndex) -> FastStartResult<Option<Self>> {
        let moov = *index.moov();
        let mdat_start = index.mdat().start;

        let free_before_mdat = index
            .iter()
            .filter(|atom| atom.is(FREE_BOX) && atom.start < mdat_start)
            .try_fold(0u64, |sum, atom| sum.checked_add(atom.size))
            .ok_or_else(|| FastStartError::format("free atom sizes overflow"))?;

        let moov_size = to_signed(moov.size, "moov")?;
        let mut delta = moov_size - to_signed(free_before_mdat, "free space")?;

        if moov.start < mdat_start {
            delta -= moov_size;
            if free_before_mdat == 0 {
                debug!("moov already precedes mdat with no free space to reclaim");
                return Ok(None);
            }
        }

        debug!(
            moov_size = moov.size,
            free_before_mdat, delta, "computed chunk offset delta"
        );

        Ok(Some(Self {
            moov,
            mdat_start,
            free_before_mdat,
            delta,
        }))
    }
}

fn to_signed(value: u64, what: &str) -> FastStartResult<i64> {
    i64::try_from(value).map_err(|_| FastStartError::format(format!("{} size too large", what)))
}
