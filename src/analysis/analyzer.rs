//! Analyzers combine a tokenizer with a chain of filters.

pub mod pipeline;
pub mod standard;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert field text into a token stream.
///
/// Implementations must be deterministic: the same input always yields the
/// same token sequence.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &'static str;

    /// Analyze `text` and collect the surviving token texts.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }
}
