//! Command line argument parsing for the crawldex CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::IndexerConfig;
use crate::error::Result;
use crate::similarity::Similarity;

/// crawldex - build a full-text index from a crawl dump
#[derive(Parser, Debug, Clone)]
#[command(name = "crawldex")]
#[command(about = "Build a full-text index from a line-oriented crawl dump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = None)]
pub struct CrawldexArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Build options, used when no subcommand is given
    #[command(flatten)]
    pub build: BuildArgs,

    /// Subcommand to execute instead of a build
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CrawldexArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show statistics of a committed index
    #[command(name = "stats")]
    Stats(StatsArgs),
}

/// Arguments of an index build.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Crawl dump to index
    #[arg(short = 'p', long = "corpus", value_name = "FILE")]
    pub corpus_path: Option<PathBuf>,

    /// Index directory; its previous contents are discarded
    #[arg(short = 'd', long = "index", value_name = "DIR")]
    pub index_path: Option<PathBuf>,

    /// Scoring model whose norms are stored
    #[arg(short = 's', long = "similarity", ignore_case = true)]
    pub similarity: Option<SimilarityArg>,

    /// File receiving elapsed-time samples
    #[arg(short = 't', long = "time-log", value_name = "FILE")]
    pub time_log: Option<PathBuf>,

    /// Do not write elapsed-time samples
    #[arg(long, conflicts_with = "time_log")]
    pub no_time_log: bool,

    /// JSON configuration file; command line options override it
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Number of same-level segments merged together
    #[arg(long)]
    pub merge_factor: Option<usize>,

    /// Flush a segment after this many buffered documents
    #[arg(long)]
    pub max_buffered_docs: Option<usize>,

    /// Keep each segment's files separate instead of packing them
    #[arg(long)]
    pub no_compound_file: bool,

    /// Index stop words instead of dropping them
    #[arg(long)]
    pub keep_stop_words: bool,

    /// Extra stop words, one per line
    #[arg(long, value_name = "FILE")]
    pub stop_words_file: Option<PathBuf>,

    /// Analyze documents on a single thread
    #[arg(long)]
    pub sequential: bool,
}

impl BuildArgs {
    /// Resolve the build configuration: defaults, then the config file,
    /// then the options given on the command line.
    pub fn to_config(&self) -> Result<IndexerConfig> {
        let mut config = match &self.config_file {
            Some(path) => IndexerConfig::from_json_file(path)?,
            None => IndexerConfig::default(),
        };

        if let Some(path) = &self.corpus_path {
            config.corpus_path = path.clone();
        }
        if let Some(path) = &self.index_path {
            config.index_path = path.clone();
        }
        if let Some(similarity) = self.similarity {
            config.writer.similarity = similarity.into();
        }
        if let Some(path) = &self.time_log {
            config.time_log_path = Some(path.clone());
        }
        if self.no_time_log {
            config.time_log_path = None;
        }
        if let Some(factor) = self.merge_factor {
            config.writer.merge_factor = factor;
        }
        if let Some(max) = self.max_buffered_docs {
            config.writer.max_buffered_docs = Some(max);
        }
        if self.no_compound_file {
            config.writer.use_compound_file = false;
        }
        if self.keep_stop_words {
            config.analyzer.stop_words.enabled = false;
        }
        if let Some(path) = &self.stop_words_file {
            config.analyzer.stop_words.extra_file = Some(path.clone());
        }
        if self.sequential {
            config.pipeline.parallel_analysis = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the stats command
#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Index directory
    #[arg(short = 'd', long = "index", value_name = "DIR", default_value = crate::config::DEFAULT_INDEX_PATH)]
    pub index_path: PathBuf,
}

/// Similarity names accepted by `-s`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityArg {
    /// Okapi BM25 with k1=1.2, b=0.75
    Bm25,
    /// Classic TF-IDF
    Tfidf,
}

impl From<SimilarityArg> for Similarity {
    fn from(arg: SimilarityArg) -> Self {
        match arg {
            SimilarityArg::Bm25 => Similarity::bm25(),
            SimilarityArg::Tfidf => Similarity::ClassicTfIdf,
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
