//! Read and write extension traits for the chunkfile's fixed-width binary primitives.
//!
//! Everything is little-endian, and every trait is implemented for any `Read`/`Write`
//! so the engine (and its tests) can run the same code path against a real file or an
//! in-memory cursor.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Read, Write};

/// High bit of a tagged length word; set for a free-space-part, clear for a data-part.
pub const TAG_FREE: u64 = 1 << 63;
const TAG_MASK: u64 = !TAG_FREE;

/// The sentinel stored in an index header-part meaning "no chunk at this id".
pub const ALL_ONES_64: u64 = u64::MAX;

/// The type tag carried by a data region part's length word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartTag {
    Data,
    Free,
}

/// A tagged length word: a part's total size (including its own header) plus its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedLen {
    pub tag: PartTag,
    pub total_size: u64,
}

impl TaggedLen {
    pub fn new(tag: PartTag, total_size: u64) -> Self {
        debug_assert_eq!(total_size & TAG_FREE, 0, "part size overflows 63 bits");
        Self { tag, total_size }
    }

    fn pack(self) -> u64 {
        let bit = match self.tag {
            PartTag::Data => 0,
            PartTag::Free => TAG_FREE,
        };
        (self.total_size & TAG_MASK) | bit
    }

    fn unpack(raw: u64) -> Self {
        let tag = if raw & TAG_FREE != 0 { PartTag::Free } else { PartTag::Data };
        Self { tag, total_size: raw & TAG_MASK }
    }
}

/// Extension trait with chunkfile-specific read methods.
pub trait ReadChunkfileExt: Read {
    #[inline]
    fn read_u64_le(&mut self) -> io::Result<u64> {
        ReadBytesExt::read_u64::<LE>(self)
    }

    fn read_magic(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_tagged_len(&mut self) -> io::Result<TaggedLen> {
        let raw = self.read_u64_le()?;
        Ok(TaggedLen::unpack(raw))
    }
}

/// Extension trait with chunkfile-specific write methods.
pub trait WriteChunkfileExt: Write {
    #[inline]
    fn write_u64_le(&mut self, v: u64) -> io::Result<()> {
        WriteBytesExt::write_u64::<LE>(self, v)
    }

    fn write_tagged_len(&mut self, len: TaggedLen) -> io::Result<()> {
        self.write_u64_le(len.pack())
    }
}

impl<R: Read> ReadChunkfileExt for R {}
impl<W: Write> WriteChunkfileExt for W {}

/// Capability to shrink the backing store to an exact byte length, needed to implement
/// trailing free-space truncation (§4.6) generically over a real file or a mock cursor.
pub trait Truncate {
    fn truncate(&mut self, new_len: u64) -> io::Result<()>;
}

impl Truncate for std::fs::File {
    fn truncate(&mut self, new_len: u64) -> io::Result<()> {
        self.set_len(new_len)
    }
}

impl Truncate for std::io::Cursor<Vec<u8>> {
    fn truncate(&mut self, new_len: u64) -> io::Result<()> {
        self.get_mut().truncate(new_len as usize);
        if self.position() > new_len {
            self.set_position(new_len);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tagged_len_round_trip() {
        let mut buf = Cursor::new(Vec::new());
        buf.write_tagged_len(TaggedLen::new(PartTag::Data, 16)).unwrap();
        buf.write_tagged_len(TaggedLen::new(PartTag::Free, (1 << 62) + 8)).unwrap();

        buf.set_position(0);
        let a = buf.read_tagged_len().unwrap();
        assert_eq!(a.tag, PartTag::Data);
        assert_eq!(a.total_size, 16);

        let b = buf.read_tagged_len().unwrap();
        assert_eq!(b.tag, PartTag::Free);
        assert_eq!(b.total_size, (1 << 62) + 8);
    }

    #[test]
    fn sentinel_is_all_ones() {
        assert_eq!(ALL_ONES_64, u64::MAX);
    }
}
