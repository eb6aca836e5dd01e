//! The data region: a singly-linked tile of data-parts and free-space-parts.
//!
//! Because each part's header only gives its own size, operations that need a part's
//! predecessor (delete coalescing, verification, first-fit allocation) walk the region
//! once from `data_begin` to `file_size`, exactly as this codebase's region-file reader
//! rebuilds its sector bitmap with a single forward pass over the header on open.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::alloc::FreeCandidate;
use crate::error::{ChunkfileError, Result};
use crate::header::{DATAPART_MIN, FREESPACE_MIN};
use crate::io::{PartTag, ReadChunkfileExt, TaggedLen, WriteChunkfileExt};

/// One part observed while walking the data region.
#[derive(Debug, Clone, Copy)]
pub struct PartInfo {
    pub pos: u64,
    pub total_size: u64,
    pub tag: PartTag,
    /// The back-reference chunk id, present only for data-parts.
    pub back_ref: Option<u64>,
}

impl PartInfo {
    #[inline]
    pub fn end(&self) -> u64 {
        self.pos + self.total_size
    }

    /// Reusable bytes this part contributes to `free_space_total` (payload-only, §3 invariant 4).
    #[inline]
    pub fn reclaimable(&self) -> u64 {
        match self.tag {
            PartTag::Free => self.total_size - FREESPACE_MIN,
            PartTag::Data => 0,
        }
    }
}

/// Read the header of the part starting at `pos` (tagged length, and the back-reference
/// if it is a data-part). Does not read the payload.
pub fn read_part_header<I: Read + Seek>(inner: &mut I, pos: u64, file_size: u64) -> Result<PartInfo> {
    inner.seek(SeekFrom::Start(pos))?;
    let tagged = inner.read_tagged_len()?;

    let min_size = match tagged.tag {
        PartTag::Data => DATAPART_MIN,
        PartTag::Free => FREESPACE_MIN,
    };
    if tagged.total_size < min_size || pos + tagged.total_size > file_size {
        return Err(ChunkfileError::CorruptedFile(format!(
            "part at offset {pos} has a length tag that does not fit the data region"
        )));
    }

    let back_ref = match tagged.tag {
        PartTag::Data => Some(inner.read_u64_le()?),
        PartTag::Free => None,
    };

    Ok(PartInfo { pos, total_size: tagged.total_size, tag: tagged.tag, back_ref })
}

/// Walk every part from `data_begin` to `file_size`, in order.
pub fn walk<I: Read + Seek>(inner: &mut I, data_begin: u64, file_size: u64) -> Result<Vec<PartInfo>> {
    let mut parts = Vec::new();
    let mut pos = data_begin;
    while pos < file_size {
        let part = read_part_header(inner, pos, file_size)?;
        pos = part.end();
        parts.push(part);
    }
    if pos != file_size {
        return Err(ChunkfileError::CorruptedFile(format!(
            "data region at offset {pos} is not tiled exactly: last part overran file_size"
        )));
    }
    Ok(parts)
}

/// Free-space-parts suitable as allocator candidates, in data-region order.
pub fn free_candidates(parts: &[PartInfo]) -> Vec<FreeCandidate> {
    parts
        .iter()
        .filter(|p| p.tag == PartTag::Free)
        .map(|p| FreeCandidate { pos: p.pos, total_size: p.total_size })
        .collect()
}

/// Write a free-space-part header (tagged length only) at `pos`. Payload bytes are left
/// untouched; they are filler and never read back.
pub fn write_free_header<I: Write + Seek>(inner: &mut I, pos: u64, total_size: u64) -> Result<()> {
    inner.seek(SeekFrom::Start(pos))?;
    inner.write_tagged_len(TaggedLen::new(PartTag::Free, total_size))?;
    Ok(())
}

/// Write a complete data-part (header, back-reference, payload) at `pos`.
pub fn write_data_part<I: Write + Seek>(inner: &mut I, pos: u64, id: u64, payload: &[u8]) -> Result<()> {
    inner.seek(SeekFrom::Start(pos))?;
    let total_size = DATAPART_MIN + payload.len() as u64;
    inner.write_tagged_len(TaggedLen::new(PartTag::Data, total_size))?;
    inner.write_u64_le(id)?;
    inner.write_all(payload)?;
    Ok(())
}

/// Check a part read via the index actually is a data-part with the expected back-reference.
fn check_is_data_part(part: &PartInfo, pos: u64, id: u64) -> Result<u64> {
    if part.tag != PartTag::Data {
        return Err(ChunkfileError::CorruptedFile(format!(
            "data region at offset {pos} is not tiled exactly: index points at a free-space-part"
        )));
    }
    let back_ref = part.back_ref.expect("data-part always has a back-reference");
    if back_ref != id {
        return Err(ChunkfileError::CorruptedFile(format!(
            "data-part back-reference mismatch: index points id {id} at a part tagged {back_ref}"
        )));
    }
    Ok(back_ref)
}

/// Read the payload of the data-part at `pos`, validating its back-reference equals `id`.
pub fn read_data_part<I: Read + Seek>(inner: &mut I, pos: u64, id: u64, file_size: u64) -> Result<Vec<u8>> {
    let part = read_part_header(inner, pos, file_size)?;
    check_is_data_part(&part, pos, id)?;
    let payload_len = (part.total_size - DATAPART_MIN) as usize;
    let mut payload = vec![0u8; payload_len];
    inner.read_exact(&mut payload)?;
    Ok(payload)
}

/// Just the payload length of the data-part at `pos`, validating the back-reference.
pub fn data_part_len<I: Read + Seek>(inner: &mut I, pos: u64, id: u64, file_size: u64) -> Result<u64> {
    let part = read_part_header(inner, pos, file_size)?;
    check_is_data_part(&part, pos, id)?;
    Ok(part.total_size - DATAPART_MIN)
}
