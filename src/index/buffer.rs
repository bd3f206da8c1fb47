//! In-memory segment under construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;

use crate::document::{Document, Field};
use crate::error::{CrawldexError, Result};
use crate::index::analyzed::AnalyzedDocument;
use crate::index::dictionary::Term;
use crate::index::posting::{Posting, PostingList};
use crate::index::segment::{DocNorms, FieldStats, NORM_FIELDS, SegmentInfo, SegmentWriter, norm_slot};
use crate::similarity::Similarity;
use crate::storage::Storage;

/// Documents added since the last flush, inverted in memory.
#[derive(Debug)]
pub struct SegmentBuffer {
    similarity: Similarity,
    postings: AHashMap<Term, PostingList>,
    documents: Vec<Document>,
    norms: Vec<DocNorms>,
    field_stats: BTreeMap<Field, FieldStats>,
}

impl SegmentBuffer {
    pub fn new(similarity: Similarity) -> Self {
        SegmentBuffer {
            similarity,
            postings: AHashMap::new(),
            documents: Vec::new(),
            norms: Vec::new(),
            field_stats: BTreeMap::new(),
        }
    }

    pub fn doc_count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of distinct terms buffered.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Invert one document. Returns its buffer-local doc id.
    pub fn add(&mut self, analyzed: AnalyzedDocument) -> Result<u32> {
        let doc_id = u32::try_from(self.documents.len())
            .map_err(|_| CrawldexError::invalid_argument("Too many buffered documents"))?;

        let mut norms = [0.0f32; NORM_FIELDS];
        for field in analyzed.fields {
            if let Some(slot) = norm_slot(field.field) {
                norms[slot] = self.similarity.norm(field.length);
                self.field_stats
                    .entry(field.field)
                    .or_default()
                    .add_length(field.length);
            }
            for (text, freq) in field.term_freqs {
                self.postings
                    .entry(Term::new(field.field, text))
                    .or_default()
                    .push(Posting::new(doc_id, freq))?;
            }
        }

        self.documents.push(analyzed.document);
        self.norms.push(norms);
        Ok(doc_id)
    }

    /// Write the buffered documents as segment `name` and reset the buffer.
    pub fn flush(
        &mut self,
        storage: Arc<dyn Storage>,
        name: &str,
        use_compound_file: bool,
    ) -> Result<SegmentInfo> {
        let mut writer = SegmentWriter::create(storage, name, self.similarity, use_compound_file)
            .map_err(|e| e.into_segment_io(&format!("Failed to create segment {name}")))?;

        let documents = std::mem::take(&mut self.documents);
        let norms = std::mem::take(&mut self.norms);
        let field_stats = std::mem::take(&mut self.field_stats);
        let mut terms: Vec<(Term, PostingList)> = self.postings.drain().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let write = |writer: &mut SegmentWriter| -> Result<()> {
            for (doc, doc_norms) in documents.iter().zip(&norms) {
                writer.add_document(doc, doc_norms)?;
            }
            for (term, postings) in &terms {
                writer.add_term(term, postings)?;
            }
            Ok(())
        };
        write(&mut writer).map_err(|e| e.into_segment_io(&format!("Failed to flush segment {name}")))?;

        writer.finish(field_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::index::analyzed::DocumentAnalyzer;
    use crate::index::segment::SegmentReader;
    use crate::storage::memory::MemoryStorage;

    fn analyzed(url: &str, title: &str, content: &str) -> AnalyzedDocument {
        DocumentAnalyzer::new(Arc::new(StandardAnalyzer::new().unwrap()))
            .analyze(Document::new(url, title, content))
            .unwrap()
    }

    #[test]
    fn test_add_inverts_fields() {
        let mut buffer = SegmentBuffer::new(Similarity::bm25());
        assert_eq!(buffer.add(analyzed("u1", "Hello World", "foo bar baz")).unwrap(), 0);
        assert_eq!(buffer.add(analyzed("u2", "Second Title", "foo foo")).unwrap(), 1);

        assert_eq!(buffer.doc_count(), 2);
        let foo = &buffer.postings[&Term::new(Field::Content, "foo")];
        assert_eq!(foo.postings(), &[Posting::new(0, 1), Posting::new(1, 2)]);
        assert_eq!(buffer.norms, vec![[2.0, 3.0], [2.0, 2.0]]);
        assert_eq!(buffer.field_stats[&Field::Content].sum_total_term_freq, 5);
        assert!(buffer.postings.contains_key(&Term::new(Field::Url, "u2")));
    }

    #[test]
    fn test_flush_writes_and_resets() {
        let storage = Arc::new(MemoryStorage::new());
        let mut buffer = SegmentBuffer::new(Similarity::ClassicTfIdf);
        buffer.add(analyzed("u1", "Hello World", "foo bar baz qux")).unwrap();

        let info = buffer.flush(storage.clone(), "seg_000000", true).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.term_count(), 0);
        assert_eq!(info.doc_count, 1);
        assert_eq!(info.similarity, Similarity::ClassicTfIdf);

        let reader = SegmentReader::open(storage.as_ref(), &info).unwrap();
        assert_eq!(reader.norm(Field::Content, 0), Some(0.5));
        assert_eq!(reader.dictionary().len(), 7);
    }
}
