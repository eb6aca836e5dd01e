//! Pluggable allocation strategy for placing new data-parts in the data region.
//!
//! This is the one configuration knob the engine exposes (see `Chunkfile::open_with_allocator`):
//! the allocator only affects where a chunk's bytes end up, never the validity of the
//! resulting file, since every implementation must satisfy the predicate in the data
//! region's "can this free-space-part hold `need` bytes" contract.

use crate::header::FREESPACE_MIN;

/// A free-space-part observed during a single forward walk of the data region.
#[derive(Debug, Clone, Copy)]
pub struct FreeCandidate {
    pub pos: u64,
    pub total_size: u64,
}

/// A candidate position satisfies `need` if it can be consumed whole or shrunk into a
/// well-formed remainder.
#[inline]
pub fn fits(total_size: u64, need: u64) -> bool {
    total_size == need || total_size >= need + FREESPACE_MIN
}

/// Strategy deciding where a new data-part of size `need` should be placed.
pub trait Allocator {
    /// Given every free-space-part found while walking the data region and the file's
    /// current length, return the chosen position. Returning `file_size` means "append".
    fn find_free_space(&self, candidates: &[FreeCandidate], need: u64, file_size: u64) -> u64;
}

/// Always appends at the end of the file. Trivially correct, never reuses holes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppendOnlyAllocator;

impl Allocator for AppendOnlyAllocator {
    fn find_free_space(&self, _candidates: &[FreeCandidate], _need: u64, file_size: u64) -> u64 {
        file_size
    }
}

/// Scans free-space-parts in data-region order and picks the first one that fits.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFitAllocator;

impl Allocator for FirstFitAllocator {
    fn find_free_space(&self, candidates: &[FreeCandidate], need: u64, file_size: u64) -> u64 {
        candidates
            .iter()
            .find(|c| fits(c.total_size, need))
            .map(|c| c.pos)
            .unwrap_or(file_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_only_ignores_candidates() {
        let a = AppendOnlyAllocator;
        let candidates = [FreeCandidate { pos: 100, total_size: 64 }];
        assert_eq!(a.find_free_space(&candidates, 32, 500), 500);
    }

    #[test]
    fn first_fit_picks_first_matching_hole() {
        let a = FirstFitAllocator;
        let candidates = [
            FreeCandidate { pos: 100, total_size: 20 }, // too small: 20 < 32 and 20 < 32+8
            FreeCandidate { pos: 200, total_size: 32 }, // exact fit
            FreeCandidate { pos: 300, total_size: 64 },
        ];
        assert_eq!(a.find_free_space(&candidates, 32, 500), 200);
    }

    #[test]
    fn first_fit_rejects_too_small_remainder() {
        let a = FirstFitAllocator;
        // need=32, FREESPACE_MIN=8: a hole of 36 would leave a remainder of 4, too small.
        let candidates = [FreeCandidate { pos: 100, total_size: 36 }];
        assert_eq!(a.find_free_space(&candidates, 32, 500), 500);
    }

    #[test]
    fn first_fit_falls_back_to_append() {
        let a = FirstFitAllocator;
        assert_eq!(a.find_free_space(&[], 32, 500), 500);
    }
}
