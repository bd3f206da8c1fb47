//! Read access to a committed index.
//!
//! The reader loads the manifest and every segment it lists. Global doc ids
//! number the documents of all segments consecutively, in manifest order,
//! which is the order documents were added in.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::document::{Document, Field};
use crate::error::{CrawldexError, Result};
use crate::index::dictionary::Term;
use crate::index::manifest::{IndexManifest, MANIFEST_FILE};
use crate::index::segment::{FieldStats, SegmentReader};
use crate::similarity::{Similarity, TermStats};
use crate::storage::file::FileStorage;
use crate::storage::{Storage, StorageConfig};

/// One posting with a global doc id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalPosting {
    pub doc_id: u64,
    pub freq: u32,
}

/// A loaded, immutable index.
#[derive(Debug)]
pub struct IndexReader {
    storage: Arc<dyn Storage>,
    manifest: IndexManifest,
    segments: Vec<SegmentReader>,
    /// Global id of the first document of each segment.
    doc_bases: Vec<u64>,
}

impl IndexReader {
    /// Open the index in directory `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(CrawldexError::path(format!(
                "Index directory {} does not exist",
                path.display()
            )));
        }
        let storage = FileStorage::new(path, StorageConfig::default())?;
        IndexReader::with_storage(Arc::new(storage))
    }

    /// Open the index held in `storage`.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Result<Self> {
        let manifest = IndexManifest::read(storage.as_ref())?;

        let mut segments = Vec::with_capacity(manifest.segments.len());
        let mut doc_bases = Vec::with_capacity(manifest.segments.len());
        let mut base = 0u64;
        for info in &manifest.segments {
            doc_bases.push(base);
            base += info.doc_count as u64;
            segments.push(SegmentReader::open(storage.as_ref(), info)?);
        }

        log::debug!(
            "Opened index {} with {} docs in {} segments",
            manifest.index_id,
            manifest.total_docs,
            segments.len()
        );
        Ok(IndexReader {
            storage,
            manifest,
            segments,
            doc_bases,
        })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn doc_count(&self) -> u64 {
        self.manifest.total_docs
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn similarity(&self) -> Similarity {
        self.manifest.similarity
    }

    /// Bytes on disk of the committed files: the manifest and every segment file.
    pub fn size_in_bytes(&self) -> Result<u64> {
        let mut total = self.storage.file_size(MANIFEST_FILE)?;
        for info in &self.manifest.segments {
            for file in &info.files {
                total += self.storage.file_size(file)?;
            }
        }
        Ok(total)
    }

    /// Segment holding global doc `doc_id` and the local id within it.
    fn locate(&self, doc_id: u64) -> Result<(&SegmentReader, u32)> {
        if doc_id >= self.doc_count() {
            return Err(CrawldexError::invalid_argument(format!(
                "Doc id {doc_id} out of range, index has {} docs",
                self.doc_count()
            )));
        }
        let i = self.doc_bases.partition_point(|&base| base <= doc_id) - 1;
        Ok((&self.segments[i], (doc_id - self.doc_bases[i]) as u32))
    }

    /// Stored fields of a document.
    pub fn document(&self, doc_id: u64) -> Result<Document> {
        let (segment, local) = self.locate(doc_id)?;
        segment
            .document(local)
            .cloned()
            .ok_or_else(|| CrawldexError::corrupt(format!("Missing stored doc {doc_id}")))
    }

    /// All documents in global doc id order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.segments.iter().flat_map(|s| s.documents().iter())
    }

    /// Postings of a term across all segments, ascending by global doc id.
    pub fn postings(&self, field: Field, term: &str) -> Result<Vec<GlobalPosting>> {
        let term = Term::new(field, term);
        let mut postings = Vec::new();
        for (segment, base) in self.segments.iter().zip(&self.doc_bases) {
            if let Some(list) = segment.postings(&term)? {
                postings.extend(list.iter().map(|p| GlobalPosting {
                    doc_id: base + p.doc_id as u64,
                    freq: p.freq,
                }));
            }
        }
        Ok(postings)
    }

    /// Number of documents containing a term.
    pub fn doc_freq(&self, field: Field, term: &str) -> u64 {
        let term = Term::new(field, term);
        self.segments
            .iter()
            .filter_map(|s| s.dictionary().get(&term))
            .map(|info| info.doc_freq as u64)
            .sum()
    }

    /// Distinct terms of a field, sorted.
    pub fn terms(&self, field: Field) -> Vec<String> {
        let mut terms = BTreeSet::new();
        for segment in &self.segments {
            for (term, _) in segment.dictionary().field_entries(field) {
                terms.insert(term.text.as_bytes());
            }
        }
        terms
            .into_iter()
            .filter_map(|bytes| std::str::from_utf8(bytes).ok())
            .map(str::to_string)
            .collect()
    }

    /// Persisted norm of a document's field.
    pub fn norm(&self, field: Field, doc_id: u64) -> Result<f32> {
        if !field.is_analyzed() {
            return Err(CrawldexError::invalid_argument(format!(
                "Field {field} has no norms"
            )));
        }
        let (segment, local) = self.locate(doc_id)?;
        segment
            .norm(field, local)
            .ok_or_else(|| CrawldexError::corrupt(format!("Missing norms of doc {doc_id}")))
    }

    /// Length statistics of a field over the whole index.
    pub fn field_stats(&self, field: Field) -> FieldStats {
        self.manifest.field_stats(field)
    }

    /// Relevance of `term` for one document's field under the index similarity.
    pub fn score(&self, field: Field, term: &str, doc_id: u64) -> Result<f32> {
        if !field.is_analyzed() {
            return Err(CrawldexError::invalid_argument(format!(
                "Field {field} is not scored"
            )));
        }
        let (segment, local) = self.locate(doc_id)?;
        let term_freq = segment
            .postings(&Term::new(field, term))?
            .and_then(|list| list.iter().find(|p| p.doc_id == local).map(|p| p.freq))
            .unwrap_or(0);

        let stats = TermStats {
            term_freq,
            doc_freq: self.doc_freq(field, term),
            doc_count: self.doc_count(),
            norm: self.norm(field, doc_id)?,
            avg_field_length: self.field_stats(field).avg_length(),
        };
        Ok(self.similarity().score(&stats))
    }
}
