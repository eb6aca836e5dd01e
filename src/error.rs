//! Error taxonomy used by every fallible chunkfile operation.
//!
//! Every structural invariant violation — bad magic, a truncated header, an index entry
//! pointing outside the data region, a back-reference mismatch, a free-space or
//! chunks-count drift, adjacent free-space-parts — is reported through one
//! `CorruptedFile` variant carrying a human-readable detail, rather than one variant per
//! invariant. Callers that need structural detail read the message; callers that need to
//! branch match on the variant.

use std::io;

/// Error type used together with [`Result`] for every call on a [`crate::Chunkfile`].
#[derive(thiserror::Error, Debug)]
pub enum ChunkfileError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("corrupted file: {0}")]
    CorruptedFile(String),
    #[error("unsupported version {0}, only version 0 is known")]
    UnsupportedVersion(u64),
    #[error("chunk {0} does not exist")]
    ChunkDoesNotExist(u64),
    #[error("reserve() could not clear space for the index without leaving a free-space-part smaller than the minimum, the file is unchanged")]
    NotImplemented,
}

/// A convenience alias for every chunkfile-fallible function.
pub type Result<T> = std::result::Result<T, ChunkfileError>;
