//! Merge engine for combining segments.
//!
//! Source segments are concatenated in commit order: documents keep their
//! relative order, and doc ids of each source are shifted by the number of
//! documents in the sources before it. Term dictionaries are combined with a
//! k-way merge so the new dictionary comes out sorted without re-sorting.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::Arc;
use std::time::Instant;

use crate::document::Field;
use crate::error::{CrawldexError, Result};
use crate::index::dictionary::Term;
use crate::index::posting::PostingList;
use crate::index::segment::{FieldStats, SegmentInfo, SegmentReader, SegmentWriter};
use crate::storage::Storage;

/// Statistics about one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of source segments.
    pub segments_merged: usize,
    /// Documents copied.
    pub docs_merged: u64,
    /// Distinct terms in the merged segment.
    pub terms_merged: u64,
    /// Wall time of the merge in milliseconds.
    pub merge_time_ms: u64,
}

/// Writes merged segments.
#[derive(Debug)]
pub struct MergeEngine {
    storage: Arc<dyn Storage>,
    use_compound_file: bool,
}

impl MergeEngine {
    pub fn new(storage: Arc<dyn Storage>, use_compound_file: bool) -> Self {
        MergeEngine {
            storage,
            use_compound_file,
        }
    }

    /// Merge `sources`, in order, into the new segment `name`.
    ///
    /// Source files are left untouched; the caller removes them once the
    /// merged segment has replaced them. On failure no file of `name` remains.
    pub fn merge(&self, sources: &[SegmentInfo], name: &str) -> Result<(SegmentInfo, MergeStats)> {
        let start = Instant::now();
        let first = sources
            .first()
            .ok_or_else(|| CrawldexError::invalid_argument("Nothing to merge"))?;
        if let Some(other) = sources.iter().find(|s| s.similarity != first.similarity) {
            return Err(CrawldexError::invalid_argument(format!(
                "Cannot merge segment {} ({}) with segment {} ({})",
                first.name, first.similarity, other.name, other.similarity
            )));
        }

        let readers = sources
            .iter()
            .map(|info| SegmentReader::open(self.storage.as_ref(), info))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.into_segment_io("Failed to open merge source"))?;

        let mut doc_bases = Vec::with_capacity(readers.len());
        let mut total: u32 = 0;
        for reader in &readers {
            doc_bases.push(total);
            total = total.checked_add(reader.doc_count()).ok_or_else(|| {
                CrawldexError::segment_io(format!("Merged segment {name} would exceed the doc limit"))
            })?;
        }

        let mut writer = SegmentWriter::create(
            self.storage.clone(),
            name,
            first.similarity,
            self.use_compound_file,
        )
        .map_err(|e| e.into_segment_io(&format!("Failed to create segment {name}")))?;

        let terms = copy_segments(&mut writer, &readers, &doc_bases)
            .map_err(|e| e.into_segment_io(&format!("Failed to merge into segment {name}")))?;

        let mut field_stats: BTreeMap<Field, FieldStats> = BTreeMap::new();
        for source in sources {
            for (field, stats) in &source.field_stats {
                field_stats.entry(*field).or_default().merge(stats);
            }
        }
        let info = writer.finish(field_stats)?;

        let stats = MergeStats {
            segments_merged: sources.len(),
            docs_merged: info.doc_count as u64,
            terms_merged: terms,
            merge_time_ms: start.elapsed().as_millis() as u64,
        };
        log::debug!(
            "Merged {} segments into {name}: {} docs, {} terms in {} ms",
            stats.segments_merged,
            stats.docs_merged,
            stats.terms_merged,
            stats.merge_time_ms
        );
        Ok((info, stats))
    }
}

/// Copy documents, then the union of all dictionaries. Returns the term count.
fn copy_segments(
    writer: &mut SegmentWriter,
    readers: &[SegmentReader],
    doc_bases: &[u32],
) -> Result<u64> {
    for reader in readers {
        for doc_id in 0..reader.doc_count() {
            let doc = reader
                .document(doc_id)
                .ok_or_else(|| CrawldexError::corrupt(format!("Missing stored doc {doc_id}")))?;
            let norms = reader
                .doc_norms(doc_id)
                .ok_or_else(|| CrawldexError::corrupt(format!("Missing norms of doc {doc_id}")))?;
            writer.add_document(doc, norms)?;
        }
    }

    // Heap of (next term, reader index); ties pop in reader order, which is
    // the order postings must be concatenated in.
    let mut cursors = vec![0usize; readers.len()];
    let mut heap: BinaryHeap<Reverse<(&Term, usize)>> = BinaryHeap::new();
    for (i, reader) in readers.iter().enumerate() {
        if let Some((term, _)) = reader.dictionary().entry(0) {
            heap.push(Reverse((term, i)));
        }
    }

    let mut terms = 0u64;
    while let Some(Reverse((term, _))) = heap.peek().copied() {
        let mut merged = PostingList::new();
        while let Some(Reverse((next, i))) = heap.peek().copied() {
            if next != term {
                break;
            }
            heap.pop();

            let reader = &readers[i];
            if let Some((_, info)) = reader.dictionary().entry(cursors[i]) {
                let postings = reader.read_postings(info)?;
                merged.append_rebased(&postings, doc_bases[i])?;
            }
            cursors[i] += 1;
            if let Some((t, _)) = reader.dictionary().entry(cursors[i]) {
                heap.push(Reverse((t, i)));
            }
        }
        writer.add_term(term, &merged)?;
        terms += 1;
    }
    Ok(terms)
}
