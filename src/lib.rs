//! # crawldex
//!
//! A full-text indexer for line-oriented web crawl dumps.
//!
//! ## Features
//!
//! - Streaming corpus reader with URL-prefix document boundaries
//! - Configurable analysis pipeline (tokenizer, lowercasing, stop words)
//! - Immutable segments with atomic, crash-safe commits
//! - Logarithmic merge policy
//! - BM25 and classic TF-IDF norms
//! - Elapsed-time sampling of long builds

pub mod analysis;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod similarity;
pub mod storage;
pub mod util;

pub mod prelude {
    pub use crate::config::IndexerConfig;
    pub use crate::document::{Document, Field};
    pub use crate::error::{CrawldexError, Result};
    pub use crate::index::{IndexReader, IndexWriter};
    pub use crate::pipeline::{BuildReport, Indexer};
    pub use crate::similarity::Similarity;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
