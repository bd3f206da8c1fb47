//! Standard analyzer used for the `title` and `content` fields.
//!
//! # Pipeline
//!
//! 1. Tokenizer (non-alphanumeric split by default)
//! 2. LowercaseFilter
//! 3. StopFilter (English list plus any configured extras), optional
//!
//! # Examples
//!
//! ```
//! use crawldex::analysis::analyzer::Analyzer;
//! use crawldex::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let terms = analyzer.terms("Hello the world and test").unwrap();
//! assert_eq!(terms, vec!["hello", "world", "test"]);
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::analysis::tokenizer::unicode_word::UnicodeWordTokenizer;
use crate::config::{AnalyzerConfig, TokenizerKind};
use crate::error::Result;

/// The analyzer applied to analyzed text fields.
#[derive(Debug, Clone)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Create a standard analyzer with the default configuration.
    pub fn new() -> Result<Self> {
        Self::from_config(&AnalyzerConfig::default())
    }

    /// Create a new standard analyzer without stop word filtering.
    pub fn without_stop_words() -> Result<Self> {
        let mut config = AnalyzerConfig::default();
        config.stop_words.enabled = false;
        Self::from_config(&config)
    }

    /// Build the analyzer described by `config`.
    ///
    /// Reads the extra stop word file, if one is configured.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        let tokenizer: Arc<dyn Tokenizer> = match &config.tokenizer {
            TokenizerKind::Alphanumeric => Arc::new(RegexTokenizer::new()?),
            TokenizerKind::UnicodeWord => Arc::new(UnicodeWordTokenizer::new()),
            TokenizerKind::Regex { pattern } => Arc::new(RegexTokenizer::with_pattern(pattern)?),
        };

        let mut analyzer = PipelineAnalyzer::new(tokenizer).with_name("standard");
        if config.lowercase {
            analyzer = analyzer.add_filter(Arc::new(LowercaseFilter::new()));
        }

        let stop = &config.stop_words;
        if stop.enabled {
            let mut extra: Vec<String> = stop.extra.iter().map(|w| w.to_lowercase()).collect();
            if let Some(path) = &stop.extra_file {
                extra.extend(StopFilter::read_word_file(path)?);
            }
            let filter = StopFilter::new().extended(extra);
            log::debug!("Stop word filter with {} words", filter.len());
            analyzer = analyzer.add_filter(Arc::new(filter));
        }

        Ok(StandardAnalyzer { inner: analyzer })
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &PipelineAnalyzer {
        &self.inner
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_analyzer() {
        let analyzer = StandardAnalyzer::new().unwrap();
        let terms = analyzer.terms("Hello the world and test").unwrap();

        assert_eq!(terms, vec!["hello", "world", "test"]);
    }

    #[test]
    fn test_without_stop_words() {
        let analyzer = StandardAnalyzer::without_stop_words().unwrap();
        let terms = analyzer.terms("The Quick, the DEAD").unwrap();

        assert_eq!(terms, vec!["the", "quick", "the", "dead"]);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let analyzer = StandardAnalyzer::new().unwrap();
        let text = "Ünïcödé TEXT, with punctuation!! and 42 numbers";

        let first = analyzer.terms(text).unwrap();
        let second = analyzer.terms(text).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["ünïcödé", "text", "punctuation", "42", "numbers"]);
    }

    #[test]
    fn test_extra_stop_words_and_tokenizer_choice() {
        let mut config = AnalyzerConfig::default();
        config.stop_words.extra = vec!["Reddit".to_string()];
        config.tokenizer = TokenizerKind::UnicodeWord;

        let analyzer = StandardAnalyzer::from_config(&config).unwrap();
        assert_eq!(
            analyzer.terms("Can't stop reddit").unwrap(),
            vec!["can't", "stop"]
        );
    }

    #[test]
    fn test_lowercase_disabled() {
        let mut config = AnalyzerConfig::default();
        config.lowercase = false;
        config.stop_words.enabled = false;

        let analyzer = StandardAnalyzer::from_config(&config).unwrap();
        assert_eq!(analyzer.terms("Mixed Case").unwrap(), vec!["Mixed", "Case"]);
    }
}
