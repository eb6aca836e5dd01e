//! The fixed 41-byte header: magic, version, and the three bookkeeping counters.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::trace;

use crate::error::{ChunkfileError, Result};
use crate::io::{ReadChunkfileExt, WriteChunkfileExt};

/// The 9-byte magic every chunkfile starts with.
pub const MAGIC: &[u8; 9] = b"CHUNKFILE";
/// The only version this crate understands.
pub const VERSION: u64 = 0;

/// Size of the fixed header: 9-byte magic + 4 u64 fields.
pub const HEADER_SIZE: u64 = 9 + 8 * 4;
/// Size of one index header-part.
pub const HEADERPART_SIZE: u64 = 8;
/// Minimum total size of a data-part (tagged length + back-reference).
pub const DATAPART_MIN: u64 = 16;
/// Minimum total size of a free-space-part (tagged length only).
pub const FREESPACE_MIN: u64 = 8;

/// Byte offset of `chunks_count` within the header.
const CHUNKS_COUNT_OFFSET: u64 = 9 + 8;

/// The three bookkeeping counters kept in memory and mirrored at the start of the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Header {
    pub chunks_count: u64,
    pub index_capacity: u64,
    pub free_space_total: u64,
}

impl Header {
    /// Byte offset where the index region begins (immediately after the header).
    #[inline]
    pub fn data_begin(&self) -> u64 {
        HEADER_SIZE + self.index_capacity * HEADERPART_SIZE
    }

    /// Write a fresh header (all counters zero) to an empty file, starting at offset 0.
    pub fn write_fresh<W: Write + Seek>(inner: &mut W) -> Result<Self> {
        let header = Self::default();
        inner.seek(SeekFrom::Start(0))?;
        inner.write_all(MAGIC)?;
        inner.write_u64_le(VERSION)?;
        header.write(inner)?;
        Ok(header)
    }

    /// Load and validate the header of an existing file of the given length.
    pub fn load<R: Read + Seek>(inner: &mut R, file_size: u64) -> Result<Self> {
        if file_size < HEADER_SIZE {
            return Err(ChunkfileError::CorruptedFile(format!(
                "file is shorter than the header ({file_size} bytes)"
            )));
        }

        inner.seek(SeekFrom::Start(0))?;
        let magic = inner.read_magic(9)?;
        if magic != MAGIC {
            return Err(ChunkfileError::CorruptedFile("bad magic, expected \"CHUNKFILE\"".to_string()));
        }

        let version = inner.read_u64_le()?;
        if version != VERSION {
            return Err(ChunkfileError::UnsupportedVersion(version));
        }

        let chunks_count = inner.read_u64_le()?;
        let index_capacity = inner.read_u64_le()?;
        let free_space_total = inner.read_u64_le()?;

        let header = Self { chunks_count, index_capacity, free_space_total };

        let data_begin = index_capacity
            .checked_mul(HEADERPART_SIZE)
            .and_then(|index_bytes| HEADER_SIZE.checked_add(index_bytes));
        match data_begin {
            Some(data_begin) if data_begin <= file_size => {}
            _ => {
                return Err(ChunkfileError::CorruptedFile(format!(
                    "index_capacity ({index_capacity}) * 8 + header does not fit in file_size ({file_size})"
                )));
            }
        }

        trace!(chunks_count, index_capacity, free_space_total, "loaded chunkfile header");

        Ok(header)
    }

    /// Rewrite the three mutable counters. Magic and version never change after creation.
    pub fn write<W: Write + Seek>(&self, inner: &mut W) -> Result<()> {
        inner.seek(SeekFrom::Start(CHUNKS_COUNT_OFFSET))?;
        inner.write_u64_le(self.chunks_count)?;
        inner.write_u64_le(self.index_capacity)?;
        inner.write_u64_le(self.free_space_total)?;
        Ok(())
    }
}
