//! Documents turned into per-field term frequencies.
//!
//! Analysis is the expensive, side-effect free half of adding a document,
//! so it is kept apart from the writer and may run on any thread.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::document::{Document, Field};
use crate::error::Result;

/// Terms of one field of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedField {
    pub field: Field,
    /// Number of indexed tokens in the field.
    pub length: u32,
    /// Distinct terms with their frequencies, sorted by term.
    pub term_freqs: Vec<(String, u32)>,
}

/// A document ready to be added to an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedDocument {
    pub document: Document,
    /// One entry per field, in [`Field::ALL`] order.
    pub fields: Vec<AnalyzedField>,
}

impl AnalyzedDocument {
    /// Analysis result of `field`.
    pub fn field(&self, field: Field) -> Option<&AnalyzedField> {
        self.fields.iter().find(|f| f.field == field)
    }
}

/// Applies an analyzer to the text fields of documents.
///
/// `url` is indexed as a single keyword term and never analyzed.
#[derive(Debug, Clone)]
pub struct DocumentAnalyzer {
    analyzer: Arc<dyn Analyzer>,
}

impl DocumentAnalyzer {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        DocumentAnalyzer { analyzer }
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// Analyze every field of `document`.
    pub fn analyze(&self, document: Document) -> Result<AnalyzedDocument> {
        let mut fields = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            let text = document.get(field);
            let analyzed = if field.is_analyzed() {
                self.analyze_text(field, text)?
            } else {
                keyword(field, text)
            };
            fields.push(analyzed);
        }
        Ok(AnalyzedDocument { document, fields })
    }

    fn analyze_text(&self, field: Field, text: &str) -> Result<AnalyzedField> {
        let mut freqs: AHashMap<String, u32> = AHashMap::new();
        let mut length = 0u32;
        for token in self.analyzer.analyze(text)? {
            length = length.saturating_add(1);
            *freqs.entry(token.text).or_insert(0) += 1;
        }

        let mut term_freqs: Vec<(String, u32)> = freqs.into_iter().collect();
        term_freqs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Ok(AnalyzedField {
            field,
            length,
            term_freqs,
        })
    }
}

fn keyword(field: Field, text: &str) -> AnalyzedField {
    if text.is_empty() {
        AnalyzedField {
            field,
            length: 0,
            term_freqs: Vec::new(),
        }
    } else {
        AnalyzedField {
            field,
            length: 1,
            term_freqs: vec![(text.to_string(), 1)],
        }
    }
}
