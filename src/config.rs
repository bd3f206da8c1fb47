//! Configuration for an index build.
//!
//! [`IndexerConfig`] is built once, from defaults, an optional JSON file and
//! command line overrides, and is then passed by reference into every
//! component. Nothing reads configuration from global state.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CrawldexError, Result};
use crate::similarity::Similarity;

/// Default document boundary marker.
pub const DEFAULT_URL_PREFIX: &str = "https://www.reddit.com";

/// Default corpus file.
pub const DEFAULT_CORPUS_PATH: &str = "data/reddit.txt";

/// Default index directory.
pub const DEFAULT_INDEX_PATH: &str = "index";

/// Default elapsed-time sample file.
pub const DEFAULT_TIME_LOG_PATH: &str = "time.txt";

/// Default number of same-level segments that triggers a merge.
pub const DEFAULT_MERGE_FACTOR: usize = 3;

/// Segments smaller than this many documents all share the lowest merge level.
pub const DEFAULT_MIN_MERGE_DOCS: u64 = 1000;

/// Default number of documents between elapsed-time samples.
pub const DEFAULT_METRICS_INTERVAL: u64 = 1000;

/// Top-level configuration of one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Corpus file to index.
    pub corpus_path: PathBuf,

    /// Index directory; its previous contents are discarded.
    pub index_path: PathBuf,

    /// Where elapsed-time samples go. `None` disables the sample file.
    pub time_log_path: Option<PathBuf>,

    /// Document boundary detection.
    pub segmenter: SegmenterConfig,

    /// Analysis of the title and content fields.
    pub analyzer: AnalyzerConfig,

    /// Segment writing and merging.
    pub writer: IndexWriterConfig,

    /// Driver behavior.
    pub pipeline: PipelineConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            time_log_path: Some(PathBuf::from(DEFAULT_TIME_LOG_PATH)),
            segmenter: SegmenterConfig::default(),
            analyzer: AnalyzerConfig::default(),
            writer: IndexWriterConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: IndexerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Check every section for values the build cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.segmenter.url_prefix.is_empty() {
            return Err(CrawldexError::invalid_argument("url_prefix must not be empty"));
        }
        self.writer.validate()?;
        self.pipeline.validate()
    }
}

/// Document boundary detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// A line starting with this prefix opens a new document.
    pub url_prefix: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

/// How field text is split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Split on every non-alphanumeric character.
    Alphanumeric,
    /// Unicode word boundaries (UAX #29).
    UnicodeWord,
    /// Every match of a custom regular expression is a token.
    Regex {
        /// The token pattern.
        pattern: String,
    },
}

/// Stop word removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopWordsConfig {
    /// Whether stop words are removed at all.
    pub enabled: bool,
    /// Words added to the English list.
    pub extra: Vec<String>,
    /// File with more words, one per line.
    pub extra_file: Option<PathBuf>,
}

impl Default for StopWordsConfig {
    fn default() -> Self {
        StopWordsConfig {
            enabled: true,
            extra: Vec::new(),
            extra_file: None,
        }
    }
}

/// Analysis of the title and content fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Tokenization strategy.
    pub tokenizer: TokenizerKind,
    /// Unicode lowercasing.
    pub lowercase: bool,
    /// Stop word removal.
    pub stop_words: StopWordsConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            tokenizer: TokenizerKind::Alphanumeric,
            lowercase: true,
            stop_words: StopWordsConfig::default(),
        }
    }
}

/// Segment writing and merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexWriterConfig {
    /// Scoring model; fixes which norms are persisted.
    pub similarity: Similarity,

    /// Number of same-level segments merged together.
    pub merge_factor: usize,

    /// Lower bound used when computing a segment's merge level.
    pub min_merge_docs: u64,

    /// Flush a segment after this many buffered documents. `None` buffers
    /// everything until commit.
    pub max_buffered_docs: Option<usize>,

    /// Pack each segment's files into a single compound file.
    pub use_compound_file: bool,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            similarity: Similarity::default(),
            merge_factor: DEFAULT_MERGE_FACTOR,
            min_merge_docs: DEFAULT_MIN_MERGE_DOCS,
            max_buffered_docs: None,
            use_compound_file: true,
        }
    }
}

impl IndexWriterConfig {
    /// Check the writer settings.
    pub fn validate(&self) -> Result<()> {
        self.similarity.validate()?;
        if self.merge_factor < 2 {
            return Err(CrawldexError::invalid_argument(format!(
                "merge_factor must be at least 2, got {}",
                self.merge_factor
            )));
        }
        if self.min_merge_docs == 0 {
            return Err(CrawldexError::invalid_argument("min_merge_docs must be positive"));
        }
        if self.max_buffered_docs == Some(0) {
            return Err(CrawldexError::invalid_argument("max_buffered_docs must be positive"));
        }
        Ok(())
    }
}

/// Driver behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Documents between elapsed-time samples.
    pub metrics_interval: u64,
    /// Documents analyzed together before being added in order.
    pub analysis_batch_size: usize,
    /// Analyze each batch on the rayon thread pool.
    pub parallel_analysis: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            analysis_batch_size: 256,
            parallel_analysis: true,
        }
    }
}

impl PipelineConfig {
    /// Check the driver settings.
    pub fn validate(&self) -> Result<()> {
        if self.metrics_interval == 0 {
            return Err(CrawldexError::invalid_argument("metrics_interval must be positive"));
        }
        if self.analysis_batch_size == 0 {
            return Err(CrawldexError::invalid_argument(
                "analysis_batch_size must be positive",
            ));
        }
        Ok(())
    }
}
