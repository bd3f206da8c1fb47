//! Sorted term dictionary.
//!
//! Terms are ordered by field, then by the bytes of their text. The on-disk
//! form shares each term's common prefix with the previous term of the same
//! field, so runs of similar terms cost little more than their suffixes.

use std::cmp::Ordering;
use std::fmt;

use crate::document::Field;
use crate::error::{CrawldexError, Result};
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{StorageInput, StorageOutput};

/// A term of one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub field: Field,
    pub text: String,
}

impl Term {
    pub fn new<S: Into<String>>(field: Field, text: S) -> Self {
        Term {
            field,
            text: text.into(),
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.field
            .cmp(&other.field)
            .then_with(|| self.text.as_bytes().cmp(other.text.as_bytes()))
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// Dictionary entry of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfo {
    /// Number of documents containing the term.
    pub doc_freq: u32,
    /// Occurrences of the term across all documents.
    pub total_freq: u64,
    /// Offset of the encoded posting list within the postings body.
    pub postings_offset: u64,
    /// Length of the encoded posting list in bytes.
    pub postings_len: u64,
}

/// An immutable, sorted term dictionary of one segment.
#[derive(Debug, Clone, Default)]
pub struct TermDictionary {
    entries: Vec<(Term, TermInfo)>,
}

impl TermDictionary {
    /// Build a dictionary from entries that are already sorted and unique.
    pub fn from_sorted(entries: Vec<(Term, TermInfo)>) -> Result<Self> {
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 >= w[1].0) {
            return Err(CrawldexError::corrupt(format!(
                "Term dictionary out of order at '{}'",
                pair[1].0
            )));
        }
        Ok(TermDictionary { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a term.
    pub fn get(&self, term: &Term) -> Option<&TermInfo> {
        self.entries
            .binary_search_by(|(t, _)| t.cmp(term))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// All entries in term order.
    pub fn iter(&self) -> impl Iterator<Item = &(Term, TermInfo)> {
        self.entries.iter()
    }

    /// The entries of one field, in term order.
    pub fn field_entries(&self, field: Field) -> &[(Term, TermInfo)] {
        let start = self.entries.partition_point(|(t, _)| t.field < field);
        let end = self.entries.partition_point(|(t, _)| t.field <= field);
        &self.entries[start..end]
    }

    /// The entry at `index` in term order.
    pub fn entry(&self, index: usize) -> Option<&(Term, TermInfo)> {
        self.entries.get(index)
    }

    /// Decode a dictionary body; reads until the end of the data.
    pub fn read<R: StorageInput>(reader: &mut StructReader<R>) -> Result<Self> {
        let mut entries: Vec<(Term, TermInfo)> = Vec::new();
        let mut prev: Vec<u8> = Vec::new();
        let mut prev_field: Option<Field> = None;

        while reader.remaining() > 0 {
            let field_id = reader.read_u8()?;
            let field = Field::from_id(field_id)
                .ok_or_else(|| CrawldexError::corrupt(format!("Unknown field id {field_id}")))?;
            if prev_field != Some(field) {
                prev.clear();
            }

            let shared = reader.read_varint()? as usize;
            if shared > prev.len() {
                return Err(CrawldexError::corrupt(format!(
                    "Shared prefix {shared} longer than previous term"
                )));
            }
            let suffix_len = reader.read_varint()? as usize;
            let suffix = reader.read_raw(suffix_len)?;
            prev.truncate(shared);
            prev.extend_from_slice(&suffix);

            let text = String::from_utf8(prev.clone())
                .map_err(|e| CrawldexError::corrupt(format!("Invalid UTF-8 term: {e}")))?;
            let info = TermInfo {
                doc_freq: reader.read_varint()? as u32,
                total_freq: reader.read_varint()?,
                postings_offset: reader.read_varint()?,
                postings_len: reader.read_varint()?,
            };
            entries.push((Term { field, text }, info));
            prev_field = Some(field);
        }

        TermDictionary::from_sorted(entries)
    }
}

/// Streams sorted dictionary entries into a structured file.
#[derive(Debug, Default)]
pub struct DictionaryEncoder {
    prev: Option<Term>,
    count: usize,
}

impl DictionaryEncoder {
    pub fn new() -> Self {
        DictionaryEncoder::default()
    }

    /// Write one entry. Terms must arrive in strictly ascending order.
    pub fn write<W: StorageOutput>(
        &mut self,
        writer: &mut StructWriter<W>,
        term: &Term,
        info: &TermInfo,
    ) -> Result<()> {
        let shared = match &self.prev {
            Some(prev) if prev >= term => {
                return Err(CrawldexError::invalid_argument(format!(
                    "Term '{term}' added after '{prev}'"
                )));
            }
            Some(prev) if prev.field == term.field => {
                common_prefix_len(prev.text.as_bytes(), term.text.as_bytes())
            }
            _ => 0,
        };
        let suffix = &term.text.as_bytes()[shared..];

        writer.write_u8(term.field.id())?;
        writer.write_varint(shared as u64)?;
        writer.write_varint(suffix.len() as u64)?;
        writer.write_raw(suffix)?;
        writer.write_varint(info.doc_freq as u64)?;
        writer.write_varint(info.total_freq)?;
        writer.write_varint(info.postings_offset)?;
        writer.write_varint(info.postings_len)?;

        self.prev = Some(term.clone());
        self.count += 1;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
