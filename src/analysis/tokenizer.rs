//! Tokenizer implementations for text analysis.
//!
//! - [`regex::RegexTokenizer`] - splits on non-alphanumeric characters (default)
//! - [`unicode_word::UnicodeWordTokenizer`] - Unicode word boundaries (UAX #29)

pub mod regex;
pub mod unicode_word;

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
