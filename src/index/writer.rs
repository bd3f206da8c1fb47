//! Index writer.
//!
//! The writer owns the index directory for the duration of one build. It
//! starts from an empty directory (create mode), inverts documents into an
//! in-memory [`SegmentBuffer`], flushes the buffer to immutable segments and
//! merges segments according to its [`MergePolicy`]. Nothing is visible to
//! readers until [`IndexWriter::commit`] writes the manifest.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use crawldex::config::IndexWriterConfig;
//! use crawldex::document::Document;
//! use crawldex::index::reader::IndexReader;
//! use crawldex::index::writer::IndexWriter;
//! use crawldex::storage::memory::MemoryStorage;
//!
//! # fn main() -> crawldex::error::Result<()> {
//! let storage = Arc::new(MemoryStorage::new());
//! let mut writer = IndexWriter::with_storage(storage.clone(), IndexWriterConfig::default())?;
//! writer.add_document(Document::new("https://www.reddit.com/1", "Hello World", "foo bar baz"))?;
//! writer.add_document(Document::new("https://www.reddit.com/2", "Second Title", "qux quux"))?;
//! assert_eq!(writer.commit()?, 2);
//!
//! let reader = IndexReader::with_storage(storage)?;
//! assert_eq!(reader.document(1)?.title, "Second Title");
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::config::IndexWriterConfig;
use crate::document::Document;
use crate::error::{CrawldexError, Result};
use crate::index::analyzed::{AnalyzedDocument, DocumentAnalyzer};
use crate::index::buffer::SegmentBuffer;
use crate::index::manifest::IndexManifest;
use crate::index::merge::MergeEngine;
use crate::index::merge_policy::{LogDocMergePolicy, MergePolicy};
use crate::index::segment::SegmentInfo;
use crate::similarity::Similarity;
use crate::storage::file::FileStorage;
use crate::storage::{Storage, StorageConfig, StorageLock};

/// Name of the lock file held while a writer is open.
pub const WRITE_LOCK: &str = "write.lock";

/// Counters of one writer session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Documents added.
    pub docs_added: u64,
    /// Segments written from the in-memory buffer.
    pub segments_flushed: u64,
    /// Merges performed.
    pub merges: u64,
    /// Documents rewritten by merges.
    pub docs_merged: u64,
    /// Segments currently live.
    pub live_segments: usize,
}

/// Builds a new index.
#[derive(Debug)]
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    config: IndexWriterConfig,
    analyzer: DocumentAnalyzer,
    merge_policy: Box<dyn MergePolicy>,
    merge_engine: MergeEngine,
    buffer: SegmentBuffer,
    segments: Vec<SegmentInfo>,
    next_segment: u64,
    stats: WriterStats,
    lock: Option<Box<dyn StorageLock>>,
    /// First flush or merge failure. Buffered documents may have been lost,
    /// so the writer refuses any further work once this is set.
    failure: Option<String>,
}

impl IndexWriter {
    /// Create a new index in the directory `path`, discarding anything it held.
    pub fn open<P: AsRef<Path>>(path: P, config: IndexWriterConfig) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() && !path.is_dir() {
            return Err(CrawldexError::index_creation(format!(
                "{} exists and is not a directory",
                path.display()
            )));
        }
        let storage = FileStorage::new(path, StorageConfig::default()).map_err(|e| {
            CrawldexError::index_creation(format!("Cannot prepare {}: {e}", path.display()))
        })?;
        let writer = IndexWriter::with_storage(Arc::new(storage), config)?;

        // Files are cleared by `with_storage`; directories only exist on disk.
        let entries = std::fs::read_dir(path).map_err(|e| {
            CrawldexError::index_creation(format!("Cannot list {}: {e}", path.display()))
        })?;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path()).map_err(|e| {
                    CrawldexError::index_creation(format!(
                        "Cannot remove {}: {e}",
                        entry.path().display()
                    ))
                })?;
            }
        }

        log::info!("Created index at {}", path.display());
        Ok(writer)
    }

    /// Create a new index in `storage`, discarding every file it held.
    pub fn with_storage(storage: Arc<dyn Storage>, config: IndexWriterConfig) -> Result<Self> {
        config.validate()?;

        let lock = storage.obtain_lock(WRITE_LOCK).map_err(|e| {
            CrawldexError::index_creation(format!(
                "Index is locked by another writer ({e}); remove {WRITE_LOCK} if no build is running"
            ))
        })?;

        let existing: Vec<String> = storage
            .list_files()
            .map_err(|e| CrawldexError::index_creation(format!("Cannot list index files: {e}")))?
            .into_iter()
            .filter(|f| f != WRITE_LOCK)
            .collect();
        for file in &existing {
            storage.delete_file(file).map_err(|e| {
                CrawldexError::index_creation(format!("Cannot remove old index file {file}: {e}"))
            })?;
        }
        if !existing.is_empty() {
            log::info!("Discarded {} files of a previous index", existing.len());
        }

        let analyzer: Arc<dyn Analyzer> = Arc::new(StandardAnalyzer::new()?);
        let merge_policy = LogDocMergePolicy::new(config.merge_factor, config.min_merge_docs);

        Ok(IndexWriter {
            merge_engine: MergeEngine::new(storage.clone(), config.use_compound_file),
            storage,
            analyzer: DocumentAnalyzer::new(analyzer),
            merge_policy: Box::new(merge_policy),
            buffer: SegmentBuffer::new(config.similarity),
            config,
            segments: Vec::new(),
            next_segment: 0,
            stats: WriterStats::default(),
            lock: Some(lock),
            failure: None,
        })
    }

    /// Use `analyzer` for the title and content fields.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = DocumentAnalyzer::new(analyzer);
        self
    }

    /// Use `merge_policy` instead of the log-doc policy from the config.
    pub fn with_merge_policy(mut self, merge_policy: Box<dyn MergePolicy>) -> Self {
        self.merge_policy = merge_policy;
        self
    }

    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    pub fn similarity(&self) -> Similarity {
        self.config.similarity
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Live segments in commit order.
    pub fn segments(&self) -> &[SegmentInfo] {
        &self.segments
    }

    /// Documents waiting in the in-memory buffer.
    pub fn buffered_docs(&self) -> usize {
        self.buffer.doc_count()
    }

    /// The document analyzer; shareable across threads.
    pub fn document_analyzer(&self) -> &DocumentAnalyzer {
        &self.analyzer
    }

    /// Analyze a document without touching the index.
    pub fn analyze(&self, document: Document) -> Result<AnalyzedDocument> {
        self.analyzer.analyze(document)
    }

    /// Analyze and add a document.
    pub fn add_document(&mut self, document: Document) -> Result<()> {
        let analyzed = self.analyze(document)?;
        self.add_analyzed(analyzed)
    }

    /// Add an analyzed document. Documents keep the order they are added in.
    pub fn add_analyzed(&mut self, analyzed: AnalyzedDocument) -> Result<()> {
        self.ensure_open()?;
        log::debug!("Adding {}", analyzed.document.url);
        self.buffer.add(analyzed)?;
        self.stats.docs_added += 1;

        if let Some(max) = self.config.max_buffered_docs {
            if self.buffer.doc_count() >= max {
                self.flush_and_merge()?;
            }
        }
        Ok(())
    }

    /// Whether an earlier flush or merge failed.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    fn ensure_open(&self) -> Result<()> {
        match &self.failure {
            Some(cause) => Err(CrawldexError::segment_io(format!(
                "Writer is closed after an earlier failure: {cause}"
            ))),
            None => Ok(()),
        }
    }

    fn flush_and_merge(&mut self) -> Result<()> {
        let result = self.flush().and_then(|()| self.maybe_merge());
        if let Err(e) = &result {
            log::error!("Writer closed: {e}");
            self.failure = Some(e.to_string());
        }
        result
    }

    fn next_segment_name(&mut self) -> String {
        let name = format!("seg_{:06}", self.next_segment);
        self.next_segment += 1;
        name
    }

    /// Write the buffer as a new segment.
    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let name = self.next_segment_name();
        let terms = self.buffer.term_count();
        let info = self
            .buffer
            .flush(self.storage.clone(), &name, self.config.use_compound_file)?;

        log::info!(
            "Flushed segment {name}: {} docs, {terms} terms in {} ms",
            info.doc_count,
            start.elapsed().as_millis()
        );
        self.segments.push(info);
        self.stats.segments_flushed += 1;
        self.stats.live_segments = self.segments.len();
        Ok(())
    }

    /// Merge until the policy has no candidate left.
    fn maybe_merge(&mut self) -> Result<()> {
        while let Some(candidate) = self.merge_policy.find_merges(&self.segments).into_iter().next() {
            let range = candidate.segments.clone();
            if range.len() < 2 || range.end > self.segments.len() {
                return Err(CrawldexError::invalid_argument(format!(
                    "Merge policy {} proposed invalid range {range:?}",
                    self.merge_policy.name()
                )));
            }

            let name = self.next_segment_name();
            let (merged, merge_stats) = self.merge_engine.merge(&self.segments[range.clone()], &name)?;

            // The merged segment is durable; swap it in, then drop the sources.
            let sources: Vec<SegmentInfo> = self.segments.splice(range, [merged]).collect();
            for source in &sources {
                for file in &source.files {
                    self.storage.delete_file(file).map_err(|e| {
                        e.into_segment_io(&format!("Failed to remove merged segment {}", source.name))
                    })?;
                }
            }

            log::info!(
                "Merged {} level {} segments into {name} ({} docs)",
                merge_stats.segments_merged,
                candidate.level,
                merge_stats.docs_merged
            );
            self.stats.merges += 1;
            self.stats.docs_merged += merge_stats.docs_merged;
            self.stats.live_segments = self.segments.len();
        }
        Ok(())
    }

    /// Flush, merge, write the manifest and release the index.
    ///
    /// Returns the number of documents in the committed index.
    pub fn commit(mut self) -> Result<u64> {
        self.ensure_open()?;
        self.flush_and_merge()?;

        let mut manifest = IndexManifest::new(self.config.similarity);
        manifest.generation = 1;
        manifest.set_segments(std::mem::take(&mut self.segments));
        manifest
            .write(self.storage.as_ref())
            .map_err(|e| e.into_segment_io("Failed to write the index manifest"))?;

        if let Some(mut lock) = self.lock.take() {
            lock.release()?;
        }

        log::info!(
            "Committed {} docs in {} segments ({} flushed, {} merges)",
            manifest.total_docs,
            manifest.segments.len(),
            self.stats.segments_flushed,
            self.stats.merges
        );
        Ok(manifest.total_docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::merge_policy::NoMergePolicy;
    use crate::index::reader::IndexReader;
    use crate::storage::memory::MemoryStorage;
    use tempfile::TempDir;

    fn doc(i: usize) -> Document {
        Document::new(
            format!("https://www.reddit.com/{i}"),
            format!("Title {i}"),
            format!("word{} shared body", i % 4),
        )
    }

    #[test]
    fn test_commit_empty_index() {
        let storage = Arc::new(MemoryStorage::new());
        let writer = IndexWriter::with_storage(storage.clone(), IndexWriterConfig::default()).unwrap();
        assert_eq!(writer.commit().unwrap(), 0);

        let reader = IndexReader::with_storage(storage.clone()).unwrap();
        assert_eq!(reader.doc_count(), 0);
        assert_eq!(reader.segment_count(), 0);

        // The lock is released on commit.
        assert!(IndexWriter::with_storage(storage, IndexWriterConfig::default()).is_ok());
    }

    #[test]
    fn test_bounded_flush_merges() {
        let storage = Arc::new(MemoryStorage::new());
        let config = IndexWriterConfig {
            max_buffered_docs: Some(2),
            min_merge_docs: 2,
            ..Default::default()
        };
        let mut writer = IndexWriter::with_storage(storage.clone(), config).unwrap();
        for i in 0..18 {
            writer.add_document(doc(i)).unwrap();
        }
        // 9 flushed segments of 2 docs collapse into one of 18.
        assert_eq!(writer.stats().segments_flushed, 9);
        assert_eq!(writer.segments().len(), 1);
        assert_eq!(writer.stats().merges, 4);
        assert_eq!(writer.commit().unwrap(), 18);

        let reader = IndexReader::with_storage(storage.clone()).unwrap();
        assert_eq!(reader.doc_count(), 18);
        assert_eq!(reader.document(17).unwrap().url, "https://www.reddit.com/17");

        // Only the live segment, the manifest and nothing else.
        let files = storage.list_files().unwrap();
        assert_eq!(files, vec!["seg_000012.cfs".to_string(), "segments.json".to_string()]);
    }

    #[test]
    fn test_no_merge_policy_keeps_segments() {
        let storage = Arc::new(MemoryStorage::new());
        let config = IndexWriterConfig {
            max_buffered_docs: Some(1),
            ..Default::default()
        };
        let mut writer = IndexWriter::with_storage(storage.clone(), config)
            .unwrap()
            .with_merge_policy(Box::new(NoMergePolicy));
        for i in 0..5 {
            writer.add_document(doc(i)).unwrap();
        }
        assert_eq!(writer.commit().unwrap(), 5);
        assert_eq!(IndexReader::with_storage(storage).unwrap().segment_count(), 5);
    }

    #[test]
    fn test_second_writer_is_locked_out() {
        let storage = Arc::new(MemoryStorage::new());
        let _writer = IndexWriter::with_storage(storage.clone(), IndexWriterConfig::default()).unwrap();
        assert!(matches!(
            IndexWriter::with_storage(storage, IndexWriterConfig::default()),
            Err(CrawldexError::IndexCreation(_))
        ));
    }

    #[test]
    fn test_open_rejects_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            IndexWriter::open(&file, IndexWriterConfig::default()),
            Err(CrawldexError::IndexCreation(_))
        ));
    }

    #[test]
    fn test_open_clears_directory() {
        let dir = TempDir::new().unwrap();
        let index = dir.path().join("index");
        std::fs::create_dir_all(index.join("nested")).unwrap();
        std::fs::write(index.join("stale.cfs"), b"old").unwrap();

        let mut writer = IndexWriter::open(&index, IndexWriterConfig::default()).unwrap();
        assert!(!index.join("stale.cfs").exists());
        assert!(!index.join("nested").exists());
        assert!(index.join(WRITE_LOCK).exists());

        writer.add_document(doc(0)).unwrap();
        assert_eq!(writer.commit().unwrap(), 1);
        assert!(!index.join(WRITE_LOCK).exists());
        assert!(index.join("segments.json").exists());
    }

    #[test]
    fn test_failed_writer_rejects_adds_and_commit() {
        let storage = Arc::new(MemoryStorage::new());
        let config = IndexWriterConfig {
            max_buffered_docs: Some(2),
            ..Default::default()
        };
        let mut writer = IndexWriter::with_storage(storage.clone(), config).unwrap();
        writer.add_document(doc(0)).unwrap();
        assert!(!writer.is_failed());

        writer.failure = Some("disk full".to_string());
        assert!(writer.is_failed());
        assert!(matches!(
            writer.add_document(doc(1)),
            Err(CrawldexError::SegmentIo(msg)) if msg.contains("disk full")
        ));
        assert_eq!(writer.stats().docs_added, 1);
        assert!(matches!(writer.commit(), Err(CrawldexError::SegmentIo(_))));
        assert!(!storage.file_exists("segments.json"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = IndexWriterConfig {
            merge_factor: 1,
            ..Default::default()
        };
        assert!(IndexWriter::with_storage(Arc::new(MemoryStorage::new()), config).is_err());
    }
}
