//! Merge policies decide which segments are combined.
//!
//! [`LogDocMergePolicy`] groups segments into logarithmic levels by document
//! count. Whenever `merge_factor` adjacent segments share the lowest level
//! that has that many, they are merged into one segment of a higher level.
//! Repeated after every flush this keeps the live segment count logarithmic
//! in the number of documents.

use std::ops::Range;

use crate::config::{DEFAULT_MERGE_FACTOR, DEFAULT_MIN_MERGE_DOCS};
use crate::index::segment::SegmentInfo;

/// A run of adjacent segments to merge into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
    /// Positions of the segments in commit order.
    pub segments: Range<usize>,
    /// Level shared by the segments.
    pub level: u32,
    /// Documents in the merged segment.
    pub doc_count: u64,
}

/// Trait for merge policies.
pub trait MergePolicy: Send + Sync + std::fmt::Debug {
    /// Candidates for `segments` (in commit order), most urgent first.
    ///
    /// Candidates are only valid for the exact segment list they were
    /// computed from; callers merge the first one and ask again.
    fn find_merges(&self, segments: &[SegmentInfo]) -> Vec<MergeCandidate>;

    /// Policy name for logs.
    fn name(&self) -> &'static str;
}

/// Merges `merge_factor` adjacent segments of the same logarithmic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogDocMergePolicy {
    merge_factor: usize,
    min_merge_docs: u64,
}

impl Default for LogDocMergePolicy {
    fn default() -> Self {
        LogDocMergePolicy {
            merge_factor: DEFAULT_MERGE_FACTOR,
            min_merge_docs: DEFAULT_MIN_MERGE_DOCS,
        }
    }
}

impl LogDocMergePolicy {
    /// Create a policy. `merge_factor` is clamped to at least 2 and
    /// `min_merge_docs` to at least 1.
    pub fn new(merge_factor: usize, min_merge_docs: u64) -> Self {
        LogDocMergePolicy {
            merge_factor: merge_factor.max(2),
            min_merge_docs: min_merge_docs.max(1),
        }
    }

    pub fn merge_factor(&self) -> usize {
        self.merge_factor
    }

    pub fn min_merge_docs(&self) -> u64 {
        self.min_merge_docs
    }

    /// `floor(log_F(max(doc_count, min_merge_docs) / min_merge_docs))`.
    pub fn level(&self, doc_count: u64) -> u32 {
        let factor = self.merge_factor as u64;
        let mut level = 0;
        let mut bound = self.min_merge_docs.saturating_mul(factor);
        while doc_count >= bound {
            level += 1;
            match bound.checked_mul(factor) {
                Some(next) => bound = next,
                None => break,
            }
        }
        level
    }
}

impl MergePolicy for LogDocMergePolicy {
    fn find_merges(&self, segments: &[SegmentInfo]) -> Vec<MergeCandidate> {
        let levels: Vec<u32> = segments
            .iter()
            .map(|s| self.level(s.doc_count as u64))
            .collect();

        let mut candidates = Vec::new();
        let mut start = 0;
        while start < levels.len() {
            let level = levels[start];
            let end = start + levels[start..].iter().take_while(|l| **l == level).count();
            if end - start >= self.merge_factor {
                candidates.push(MergeCandidate {
                    segments: start..end,
                    level,
                    doc_count: segments[start..end]
                        .iter()
                        .map(|s| s.doc_count as u64)
                        .sum(),
                });
            }
            start = end;
        }

        // Lowest level first; among equal levels the oldest run.
        candidates.sort_by_key(|c| (c.level, c.segments.start));
        candidates
    }

    fn name(&self) -> &'static str {
        "log_doc"
    }
}

/// Never merges.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMergePolicy;

impl MergePolicy for NoMergePolicy {
    fn find_merges(&self, _segments: &[SegmentInfo]) -> Vec<MergeCandidate> {
        Vec::new()
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
