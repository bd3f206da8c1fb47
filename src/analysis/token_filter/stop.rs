//! Stop filter implementation.
//!
//! # Examples
//!
//! ```
//! use crawldex::analysis::token_filter::Filter;
//! use crawldex::analysis::token_filter::stop::StopFilter;
//! use crawldex::analysis::token::Token;
//!
//! let filter = StopFilter::new();
//! let tokens = vec![
//!     Token::new("the", 0),
//!     Token::new("quick", 1),
//!     Token::new("brown", 2),
//! ];
//!
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//! assert_eq!(result.len(), 2);
//! assert_eq!(result[0].text, "quick");
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::{CrawldexError, Result};

/// Default English stop words list.
pub const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Default English stop words as a HashSet.
pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<HashSet<String>> = LazyLock::new(|| {
    DEFAULT_ENGLISH_STOP_WORDS
        .iter()
        .map(|&s| s.to_string())
        .collect()
});

/// A filter that removes stop words from the token stream.
///
/// Matching is exact, so the filter belongs after lowercasing.
#[derive(Clone, Debug)]
pub struct StopFilter {
    stop_words: Arc<HashSet<String>>,
}

impl StopFilter {
    /// Create a stop filter with the default English list.
    pub fn new() -> Self {
        Self::with_stop_words(DEFAULT_ENGLISH_STOP_WORDS_SET.clone())
    }

    /// Create a stop filter with a custom stop word set.
    pub fn with_stop_words(stop_words: HashSet<String>) -> Self {
        StopFilter {
            stop_words: Arc::new(stop_words),
        }
    }

    /// Create a stop filter from a list of words.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_stop_words(words.into_iter().map(Into::into).collect())
    }

    /// Return a filter whose set is this one extended with `words`.
    pub fn extended<I, S>(&self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = (*self.stop_words).clone();
        set.extend(words.into_iter().map(Into::into));
        Self::with_stop_words(set)
    }

    /// Read a stop word file: one word per line, blank lines and `#` comments ignored.
    ///
    /// Words are lowercased on load.
    pub fn read_word_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CrawldexError::path(format!(
                "Cannot read stop word file {}: {e}",
                path.display()
            ))
        })?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .collect())
    }

    /// Check if a word is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Number of stop words in the set.
    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stop_words = Arc::clone(&self.stop_words);
        let filtered: Vec<Token> = tokens
            .filter(|token| !stop_words.contains(&token.text))
            .collect();

        Ok(Box::new(filtered.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_stop_filter() {
        let filter = StopFilter::new();
        let tokens = vec![
            Token::new("this", 0),
            Token::new("is", 1),
            Token::new("test", 2),
        ];

        let result: Vec<Token> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "test");
        assert_eq!(result[0].position, 2);
    }

    #[test]
    fn test_extended_stop_words() {
        let filter = StopFilter::new().extended(["reddit", "upvote"]);
        assert!(filter.is_stop_word("the"));
        assert!(filter.is_stop_word("reddit"));
        assert!(!filter.is_stop_word("rust"));
        assert_eq!(filter.len(), DEFAULT_ENGLISH_STOP_WORDS.len() + 2);
    }

    #[test]
    fn test_read_word_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# domain words").unwrap();
        writeln!(file, "Subreddit").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  karma  ").unwrap();

        let words = StopFilter::read_word_file(file.path()).unwrap();
        assert_eq!(words, vec!["subreddit", "karma"]);

        let missing = StopFilter::read_word_file("/nonexistent/stop.txt").unwrap_err();
        assert!(matches!(missing, CrawldexError::Path(_)));
    }
}
