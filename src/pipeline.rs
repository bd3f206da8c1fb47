//! The build driver: corpus in, committed index out.
//!
//! Documents stream from the corpus in file order. They are analyzed in
//! batches, optionally on the rayon pool, and then added to the writer one
//! by one in their original order, so parallel analysis never changes the
//! resulting index.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::config::IndexerConfig;
use crate::corpus;
use crate::document::Document;
use crate::error::Result;
use crate::index::analyzed::{AnalyzedDocument, DocumentAnalyzer};
use crate::index::writer::IndexWriter;
use crate::metrics::{MetricsSink, NoopSink, TimeFileSink};
use crate::similarity::Similarity;

/// Outcome of a completed build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub corpus_path: PathBuf,
    pub index_path: PathBuf,
    pub similarity: Similarity,
    /// Documents in the committed index.
    pub doc_count: u64,
    /// Wall time from start to commit, in milliseconds.
    pub elapsed_ms: u64,
    /// Live segments after the final merge.
    pub segments: usize,
    pub segments_flushed: u64,
    pub merges: u64,
    /// Elapsed-time samples handed to the metrics sink.
    pub samples: u64,
}

/// Runs one build described by an [`IndexerConfig`].
#[derive(Debug, Clone)]
pub struct Indexer {
    config: IndexerConfig,
}

impl Indexer {
    /// Validate `config` and prepare a build.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Indexer { config })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Build the index, writing samples to the configured time log if any.
    ///
    /// The time log is only created once the corpus has been opened.
    pub fn run(&self) -> Result<BuildReport> {
        let documents = self.open_corpus()?;
        match &self.config.time_log_path {
            Some(path) => self.build(documents, &mut TimeFileSink::create(path)?),
            None => self.build(documents, &mut NoopSink),
        }
    }

    /// Build the index, sending elapsed-time samples to `sink`.
    pub fn run_with_sink(&self, sink: &mut dyn MetricsSink) -> Result<BuildReport> {
        let documents = self.open_corpus()?;
        self.build(documents, sink)
    }

    // Opened before anything is written, so a bad path leaves the index
    // directory and the time log alone.
    fn open_corpus(&self) -> Result<impl Iterator<Item = Result<Document>>> {
        corpus::read_documents(&self.config.corpus_path, &self.config.segmenter)
    }

    fn build(
        &self,
        mut documents: impl Iterator<Item = Result<Document>>,
        sink: &mut dyn MetricsSink,
    ) -> Result<BuildReport> {
        let start = Instant::now();
        let config = &self.config;

        let analyzer = StandardAnalyzer::from_config(&config.analyzer)?;
        let mut writer = IndexWriter::open(&config.index_path, config.writer.clone())?
            .with_analyzer(Arc::new(analyzer));
        log::info!(
            "Indexing {} into {} with {}",
            config.corpus_path.display(),
            config.index_path.display(),
            config.writer.similarity
        );

        let interval = config.pipeline.metrics_interval;
        let batch_size = config.pipeline.analysis_batch_size;
        let mut samples = 0u64;
        let mut added = 0u64;

        loop {
            let batch = documents
                .by_ref()
                .take(batch_size)
                .collect::<Result<Vec<Document>>>()?;
            if batch.is_empty() {
                break;
            }

            let analyzed = analyze_batch(
                writer.document_analyzer(),
                batch,
                config.pipeline.parallel_analysis,
            )?;
            for document in analyzed {
                writer.add_analyzed(document)?;
                added += 1;
                if added % interval == 0 {
                    sink.record(samples, start.elapsed().as_millis() as u64)?;
                    samples += 1;
                }
            }
        }

        let stats = writer.stats().clone();
        let doc_count = writer.commit()?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        sink.record(samples, elapsed_ms)?;
        samples += 1;
        sink.finish()?;

        log::info!("Indexed {doc_count} docs in {elapsed_ms} ms");
        Ok(BuildReport {
            corpus_path: config.corpus_path.clone(),
            index_path: config.index_path.clone(),
            similarity: config.writer.similarity,
            doc_count,
            elapsed_ms,
            segments: stats.live_segments,
            segments_flushed: stats.segments_flushed,
            merges: stats.merges,
            samples,
        })
    }
}

/// Analyze `batch`, keeping its order.
fn analyze_batch(
    analyzer: &DocumentAnalyzer,
    batch: Vec<Document>,
    parallel: bool,
) -> Result<Vec<AnalyzedDocument>> {
    if parallel && batch.len() > 1 {
        batch
            .into_par_iter()
            .map(|document| analyzer.analyze(document))
            .collect()
    } else {
        batch
            .into_iter()
            .map(|document| analyzer.analyze(document))
            .collect()
    }
}
