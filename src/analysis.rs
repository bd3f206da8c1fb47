//! Text analysis.
//!
//! Raw field text flows through a [`tokenizer::Tokenizer`] and a chain of
//! [`token_filter::Filter`]s assembled by an [`analyzer::Analyzer`]. Analyzers
//! are immutable after construction, so one instance can be shared across
//! threads and always yields the same tokens for the same input.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
