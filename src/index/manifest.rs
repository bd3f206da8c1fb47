//! The commit point of an index.
//!
//! `segments.json` lists the segments that make up the committed index. It
//! is replaced atomically: written under a temporary name, synced, then
//! renamed over the previous version. Segment files not listed in it are
//! not part of the index.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Field;
use crate::error::{CrawldexError, Result};
use crate::index::segment::{FieldStats, SegmentInfo};
use crate::similarity::Similarity;
use crate::storage::Storage;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "segments.json";

/// Manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

const MANIFEST_TEMP_FILE: &str = "segments.json.tmp";

/// Contents of `segments.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    /// Identity of this index build.
    pub index_id: Uuid,
    /// Incremented on every commit.
    pub generation: u64,
    pub similarity: Similarity,
    pub total_docs: u64,
    /// Live segments in commit order; global doc ids follow this order.
    pub segments: Vec<SegmentInfo>,
    pub committed_at: DateTime<Utc>,
    /// Crate version that wrote the index.
    pub created_by: String,
}

impl IndexManifest {
    /// A manifest for an index without any segment yet.
    pub fn new(similarity: Similarity) -> Self {
        IndexManifest {
            format_version: MANIFEST_VERSION,
            index_id: Uuid::new_v4(),
            generation: 0,
            similarity,
            total_docs: 0,
            segments: Vec::new(),
            committed_at: Utc::now(),
            created_by: format!("crawldex {}", crate::VERSION),
        }
    }

    /// Replace the segment list and recompute the document total.
    pub fn set_segments(&mut self, segments: Vec<SegmentInfo>) {
        self.total_docs = segments.iter().map(|s| s.doc_count as u64).sum();
        self.segments = segments;
    }

    /// Statistics of `field` summed over all segments.
    pub fn field_stats(&self, field: Field) -> FieldStats {
        let mut stats = FieldStats::default();
        for segment in &self.segments {
            stats.merge(&segment.stats(field));
        }
        stats
    }

    /// Check internal consistency after loading.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MANIFEST_VERSION {
            return Err(CrawldexError::corrupt(format!(
                "Unsupported manifest version {}, expected {MANIFEST_VERSION}",
                self.format_version
            )));
        }
        let total: u64 = self.segments.iter().map(|s| s.doc_count as u64).sum();
        if total != self.total_docs {
            return Err(CrawldexError::corrupt(format!(
                "Manifest lists {} docs but its segments hold {total}",
                self.total_docs
            )));
        }
        if let Some(segment) = self.segments.iter().find(|s| s.similarity != self.similarity) {
            return Err(CrawldexError::corrupt(format!(
                "Segment {} uses {}, index uses {}",
                segment.name, segment.similarity, self.similarity
            )));
        }
        Ok(())
    }

    /// Durably replace the manifest in `storage` with this one.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let mut output = storage.create_output(MANIFEST_TEMP_FILE)?;
        output.write_all(&json)?;
        output.flush_and_sync()?;
        output.close()?;
        drop(output);

        storage.rename_file(MANIFEST_TEMP_FILE, MANIFEST_FILE)?;
        storage.sync()
    }

    /// Load the manifest from `storage`.
    pub fn read(storage: &dyn Storage) -> Result<Self> {
        if !storage.file_exists(MANIFEST_FILE) {
            return Err(CrawldexError::path(format!(
                "No {MANIFEST_FILE} found; the index was never committed"
            )));
        }
        let mut input = storage.open_input(MANIFEST_FILE)?;
        let mut json = Vec::new();
        input.read_to_end(&mut json)?;
        let manifest: IndexManifest = serde_json::from_slice(&json)
            .map_err(|e| CrawldexError::corrupt(format!("Unreadable {MANIFEST_FILE}: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use std::collections::BTreeMap;

    fn segment(name: &str, doc_count: u32, title_len: u64) -> SegmentInfo {
        let mut field_stats = BTreeMap::new();
        field_stats.insert(
            Field::Title,
            FieldStats {
                docs_with_field: doc_count as u64,
                sum_total_term_freq: title_len,
            },
        );
        SegmentInfo {
            name: name.to_string(),
            id: Uuid::new_v4(),
            doc_count,
            similarity: Similarity::bm25(),
            compound: true,
            files: vec![format!("{name}.cfs")],
            field_stats,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_write_and_read() {
        let storage = MemoryStorage::new();
        let mut manifest = IndexManifest::new(Similarity::bm25());
        manifest.set_segments(vec![segment("seg_000000", 3, 6), segment("seg_000001", 1, 4)]);
        manifest.write(&storage).unwrap();

        assert!(storage.file_exists(MANIFEST_FILE));
        assert!(!storage.file_exists(MANIFEST_TEMP_FILE));

        let read = IndexManifest::read(&storage).unwrap();
        assert_eq!(read, manifest);
        assert_eq!(read.total_docs, 4);
        let title = read.field_stats(Field::Title);
        assert_eq!(title.sum_total_term_freq, 10);
        assert_eq!(title.avg_length(), 2.5);
    }

    #[test]
    fn test_missing_manifest() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            IndexManifest::read(&storage),
            Err(CrawldexError::Path(_))
        ));
    }

    #[test]
    fn test_inconsistent_manifest_is_corrupt() {
        let storage = MemoryStorage::new();
        let mut manifest = IndexManifest::new(Similarity::ClassicTfIdf);
        manifest.set_segments(vec![segment("seg_000000", 3, 6)]);
        manifest.write(&storage).unwrap();
        assert!(matches!(
            IndexManifest::read(&storage),
            Err(CrawldexError::Corrupt(_))
        ));

        let mut output = storage.create_output(MANIFEST_FILE).unwrap();
        output.write_all(b"{ not json").unwrap();
        output.close().unwrap();
        drop(output);
        assert!(matches!(
            IndexManifest::read(&storage),
            Err(CrawldexError::Corrupt(_))
        ));
    }
}
