//! Immutable index segments.
//!
//! A segment is written once and never modified. It consists of four parts:
//!
//! | part  | content                                                       |
//! |-------|---------------------------------------------------------------|
//! | `dic` | sorted term dictionary pointing into the postings             |
//! | `pst` | encoded posting lists, in dictionary order                    |
//! | `fdt` | stored `url`, `title` and `content` of every document         |
//! | `nrm` | one norm per analyzed field per document                      |
//!
//! With compound files enabled the parts are packed into a single `cfs` file.
//!
//! [`SegmentWriter`] is the write side; every file it produces carries a
//! `.tmp` suffix until [`SegmentWriter::finish`] renames it into place, and
//! a writer that is dropped unfinished deletes whatever it wrote.
//! [`SegmentReader`] is the read side.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::{Document, Field};
use crate::error::{CrawldexError, Result};
use crate::index::compound::{CompoundReader, write_compound};
use crate::index::dictionary::{DictionaryEncoder, Term, TermDictionary, TermInfo};
use crate::index::posting::PostingList;
use crate::similarity::Similarity;
use crate::storage::memory::MemoryInput;
use crate::storage::structured::{StructReader, StructWriter};
use crate::storage::{Storage, StorageInput, StorageOutput};

/// Version shared by all segment part formats.
pub const SEGMENT_FORMAT_VERSION: u32 = 1;

/// Term dictionary part.
pub const EXT_DICTIONARY: &str = "dic";
/// Postings part.
pub const EXT_POSTINGS: &str = "pst";
/// Stored fields part.
pub const EXT_STORED: &str = "fdt";
/// Norms part.
pub const EXT_NORMS: &str = "nrm";
/// Compound file holding all parts.
pub const EXT_COMPOUND: &str = "cfs";

/// Part extensions in packing order.
pub const PART_EXTENSIONS: [&str; 4] = [EXT_DICTIONARY, EXT_POSTINGS, EXT_STORED, EXT_NORMS];

const MAGIC_DICTIONARY: u32 = 0x4344_5844; // "CDXD"
const MAGIC_POSTINGS: u32 = 0x4344_5850; // "CDXP"
const MAGIC_STORED: u32 = 0x4344_5853; // "CDXS"
const MAGIC_NORMS: u32 = 0x4344_584E; // "CDXN"

/// Length of the `magic + version` header of every part.
const HEADER_LEN: u64 = 8;

/// Suffix of files that are still being written.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Number of norms stored per document, one per analyzed field.
pub const NORM_FIELDS: usize = Field::ANALYZED.len();

/// Norms of one document, in [`Field::ANALYZED`] order.
pub type DocNorms = [f32; NORM_FIELDS];

/// Slot of `field` within [`DocNorms`]; `None` for fields without norms.
pub fn norm_slot(field: Field) -> Option<usize> {
    Field::ANALYZED.iter().position(|f| *f == field)
}

/// File name of a segment part.
pub fn segment_file_name(segment: &str, ext: &str) -> String {
    format!("{segment}.{ext}")
}

fn temp_name(file_name: &str) -> String {
    format!("{file_name}{TEMP_SUFFIX}")
}

/// Length statistics of one analyzed field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Documents with at least one token in the field.
    pub docs_with_field: u64,
    /// Tokens in the field summed over all documents.
    pub sum_total_term_freq: u64,
}

impl FieldStats {
    /// Account for one document whose field holds `length` tokens.
    pub fn add_length(&mut self, length: u32) {
        if length > 0 {
            self.docs_with_field += 1;
            self.sum_total_term_freq += length as u64;
        }
    }

    /// Fold in the statistics of another segment.
    pub fn merge(&mut self, other: &FieldStats) {
        self.docs_with_field += other.docs_with_field;
        self.sum_total_term_freq += other.sum_total_term_freq;
    }

    /// Mean field length over documents having the field.
    pub fn avg_length(&self) -> f32 {
        if self.docs_with_field == 0 {
            0.0
        } else {
            (self.sum_total_term_freq as f64 / self.docs_with_field as f64) as f32
        }
    }
}

/// Metadata of a committed segment, recorded in the index manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// File name stem shared by the segment's files.
    pub name: String,
    pub id: Uuid,
    pub doc_count: u32,
    /// Scoring model whose norms the segment carries.
    pub similarity: Similarity,
    /// Whether the parts are packed into a compound file.
    pub compound: bool,
    /// Files that make up the segment.
    pub files: Vec<String>,
    /// Per analyzed field length statistics.
    pub field_stats: BTreeMap<Field, FieldStats>,
    pub created_at: DateTime<Utc>,
}

impl SegmentInfo {
    /// Statistics of `field`; zero for fields without any tokens.
    pub fn stats(&self, field: Field) -> FieldStats {
        self.field_stats.get(&field).copied().unwrap_or_default()
    }
}

type PartWriter = StructWriter<Box<dyn StorageOutput>>;

struct PartWriters {
    dictionary: PartWriter,
    postings: PartWriter,
    stored: PartWriter,
    norms: PartWriter,
}

/// Writes one new segment.
///
/// Documents are added first, in doc id order, then terms in ascending
/// [`Term`] order.
pub struct SegmentWriter {
    storage: Arc<dyn Storage>,
    name: String,
    similarity: Similarity,
    use_compound_file: bool,
    parts: Option<PartWriters>,
    dictionary: DictionaryEncoder,
    doc_count: u32,
    scratch: Vec<u8>,
    finished: bool,
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("name", &self.name)
            .field("doc_count", &self.doc_count)
            .field("terms", &self.dictionary.count())
            .field("finished", &self.finished)
            .finish()
    }
}

impl SegmentWriter {
    /// Start writing segment `name`.
    pub fn create(
        storage: Arc<dyn Storage>,
        name: &str,
        similarity: Similarity,
        use_compound_file: bool,
    ) -> Result<Self> {
        let mut writer = SegmentWriter {
            storage,
            name: name.to_string(),
            similarity,
            use_compound_file,
            parts: None,
            dictionary: DictionaryEncoder::new(),
            doc_count: 0,
            scratch: Vec::new(),
            finished: false,
        };
        // On error the partially created outputs are removed by drop.
        writer.parts = Some(PartWriters {
            dictionary: writer.open_part(EXT_DICTIONARY, MAGIC_DICTIONARY)?,
            postings: writer.open_part(EXT_POSTINGS, MAGIC_POSTINGS)?,
            stored: writer.open_part(EXT_STORED, MAGIC_STORED)?,
            norms: writer.open_part(EXT_NORMS, MAGIC_NORMS)?,
        });
        Ok(writer)
    }

    fn open_part(&self, ext: &str, magic: u32) -> Result<PartWriter> {
        let file_name = temp_name(&segment_file_name(&self.name, ext));
        let mut writer = StructWriter::new(self.storage.create_output(&file_name)?);
        writer.write_header(magic, SEGMENT_FORMAT_VERSION)?;
        Ok(writer)
    }

    fn parts(&mut self) -> Result<&mut PartWriters> {
        self.parts
            .as_mut()
            .ok_or_else(|| CrawldexError::segment_io("Segment writer already finished"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of documents added so far.
    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Append a document with its norms. Returns its segment-local doc id.
    pub fn add_document(&mut self, doc: &Document, norms: &DocNorms) -> Result<u32> {
        let doc_id = self.doc_count;
        let parts = self.parts()?;
        for field in Field::ALL {
            parts.stored.write_string(doc.get(field))?;
        }
        for norm in norms {
            parts.norms.write_f32(*norm)?;
        }
        self.doc_count = doc_id
            .checked_add(1)
            .ok_or_else(|| CrawldexError::segment_io("Too many documents in one segment"))?;
        Ok(doc_id)
    }

    /// Append the posting list of `term`. Terms must arrive in ascending order
    /// and refer only to documents already added.
    pub fn add_term(&mut self, term: &Term, postings: &PostingList) -> Result<()> {
        match postings.postings().last() {
            None => {
                return Err(CrawldexError::invalid_argument(format!(
                    "Empty posting list for '{term}'"
                )));
            }
            Some(last) if last.doc_id >= self.doc_count => {
                return Err(CrawldexError::invalid_argument(format!(
                    "Posting for '{term}' refers to doc {} of {}",
                    last.doc_id, self.doc_count
                )));
            }
            Some(_) => {}
        }

        self.scratch.clear();
        postings.encode_into(&mut self.scratch);

        let parts = self
            .parts
            .as_mut()
            .ok_or_else(|| CrawldexError::segment_io("Segment writer already finished"))?;
        let info = TermInfo {
            doc_freq: postings.doc_freq(),
            total_freq: postings.total_freq(),
            postings_offset: parts.postings.position() - HEADER_LEN,
            postings_len: self.scratch.len() as u64,
        };
        self.dictionary.write(&mut parts.dictionary, term, &info)?;
        parts.postings.write_raw(&self.scratch)
    }

    /// Close every part, put the files in place and describe the segment.
    ///
    /// Any failure removes the segment's files and is reported as a segment
    /// I/O error.
    pub fn finish(mut self, field_stats: BTreeMap<Field, FieldStats>) -> Result<SegmentInfo> {
        let files = self
            .finish_files()
            .map_err(|e| e.into_segment_io(&format!("Failed to write segment {}", self.name)))?;
        self.finished = true;

        log::debug!(
            "Wrote segment {} ({} docs, {} terms, {} files)",
            self.name,
            self.doc_count,
            self.dictionary.count(),
            files.len()
        );

        Ok(SegmentInfo {
            name: self.name.clone(),
            id: Uuid::new_v4(),
            doc_count: self.doc_count,
            similarity: self.similarity,
            compound: self.use_compound_file,
            files,
            field_stats,
            created_at: Utc::now(),
        })
    }

    fn finish_files(&mut self) -> Result<Vec<String>> {
        let parts = self
            .parts
            .take()
            .ok_or_else(|| CrawldexError::segment_io("Segment writer already finished"))?;
        parts.dictionary.close()?;
        parts.postings.close()?;
        parts.stored.close()?;
        parts.norms.close()?;

        let part_files: Vec<(&str, String)> = PART_EXTENSIONS
            .iter()
            .map(|ext| (*ext, segment_file_name(&self.name, ext)))
            .collect();

        let files = if self.use_compound_file {
            let compound = segment_file_name(&self.name, EXT_COMPOUND);
            let temp_parts: Vec<(&str, String)> = part_files
                .iter()
                .map(|(ext, file)| (*ext, temp_name(file)))
                .collect();
            write_compound(self.storage.as_ref(), &temp_name(&compound), &temp_parts)?;
            self.storage.rename_file(&temp_name(&compound), &compound)?;
            for (_, temp) in &temp_parts {
                self.storage.delete_file(temp)?;
            }
            vec![compound]
        } else {
            for (_, file) in &part_files {
                self.storage.rename_file(&temp_name(file), file)?;
            }
            part_files.into_iter().map(|(_, file)| file).collect()
        };

        self.storage.sync()?;
        Ok(files)
    }

    fn remove_files(&mut self) {
        // Outputs must be closed before their files can be removed.
        self.parts = None;
        let exts = PART_EXTENSIONS.iter().chain(std::iter::once(&EXT_COMPOUND));
        for ext in exts {
            let file = segment_file_name(&self.name, ext);
            for name in [temp_name(&file), file] {
                if let Err(e) = self.storage.delete_file(&name) {
                    log::warn!("Failed to remove {name} of unfinished segment: {e}");
                }
            }
        }
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("Removing unfinished segment {}", self.name);
            self.remove_files();
        }
    }
}

/// Read-only view of a committed segment, fully loaded and verified.
#[derive(Debug)]
pub struct SegmentReader {
    info: SegmentInfo,
    dictionary: TermDictionary,
    postings: Vec<u8>,
    documents: Vec<Document>,
    norms: Vec<DocNorms>,
}

impl SegmentReader {
    /// Load segment `info` from `storage`.
    pub fn open(storage: &dyn Storage, info: &SegmentInfo) -> Result<Self> {
        let mut compound = if info.compound {
            let name = segment_file_name(&info.name, EXT_COMPOUND);
            Some(CompoundReader::open(storage, &name)?)
        } else {
            None
        };
        let mut open_part = |ext: &str| -> Result<Box<dyn StorageInput>> {
            match compound.as_mut() {
                Some(compound) => Ok(Box::new(MemoryInput::from_bytes(compound.take_part(ext)?))),
                None => storage.open_input(&segment_file_name(&info.name, ext)),
            }
        };

        let dictionary = read_part(open_part(EXT_DICTIONARY)?, MAGIC_DICTIONARY, |r| {
            TermDictionary::read(r)
        })?;
        let postings = read_part(open_part(EXT_POSTINGS)?, MAGIC_POSTINGS, |r| {
            let len = r.remaining() as usize;
            r.read_raw(len)
        })?;
        let documents = read_part(open_part(EXT_STORED)?, MAGIC_STORED, |r| {
            let mut documents = Vec::with_capacity(info.doc_count as usize);
            while r.remaining() > 0 {
                documents.push(Document {
                    url: r.read_string()?,
                    title: r.read_string()?,
                    content: r.read_string()?,
                });
            }
            Ok(documents)
        })?;
        let norms = read_part(open_part(EXT_NORMS)?, MAGIC_NORMS, |r| {
            let mut norms = Vec::with_capacity(info.doc_count as usize);
            while r.remaining() > 0 {
                let mut doc_norms = [0.0f32; NORM_FIELDS];
                for norm in doc_norms.iter_mut() {
                    *norm = r.read_f32()?;
                }
                norms.push(doc_norms);
            }
            Ok(norms)
        })?;

        let expected = info.doc_count as usize;
        if documents.len() != expected || norms.len() != expected {
            return Err(CrawldexError::corrupt(format!(
                "Segment {} lists {expected} docs but holds {} stored and {} norms",
                info.name,
                documents.len(),
                norms.len()
            )));
        }

        Ok(SegmentReader {
            info: info.clone(),
            dictionary,
            postings,
            documents,
            norms,
        })
    }

    pub fn info(&self) -> &SegmentInfo {
        &self.info
    }

    pub fn doc_count(&self) -> u32 {
        self.info.doc_count
    }

    pub fn dictionary(&self) -> &TermDictionary {
        &self.dictionary
    }

    /// Decode the posting list a dictionary entry points to.
    pub fn read_postings(&self, info: &TermInfo) -> Result<PostingList> {
        let start = info.postings_offset as usize;
        let end = start
            .checked_add(info.postings_len as usize)
            .filter(|&end| end <= self.postings.len())
            .ok_or_else(|| {
                CrawldexError::corrupt(format!(
                    "Postings at {start}+{} outside segment {}",
                    info.postings_len, self.info.name
                ))
            })?;
        let list = PostingList::decode(&self.postings[start..end])?;
        if list.doc_freq() != info.doc_freq {
            return Err(CrawldexError::corrupt(format!(
                "Posting list has {} docs, dictionary says {}",
                list.doc_freq(),
                info.doc_freq
            )));
        }
        Ok(list)
    }

    /// The posting list of `term`, if the segment contains it.
    pub fn postings(&self, term: &Term) -> Result<Option<PostingList>> {
        match self.dictionary.get(term) {
            Some(info) => self.read_postings(info).map(Some),
            None => Ok(None),
        }
    }

    pub fn document(&self, doc_id: u32) -> Option<&Document> {
        self.documents.get(doc_id as usize)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// All norms of a document.
    pub fn doc_norms(&self, doc_id: u32) -> Option<&DocNorms> {
        self.norms.get(doc_id as usize)
    }

    /// Norm of one field of a document; `None` for fields without norms.
    pub fn norm(&self, field: Field, doc_id: u32) -> Option<f32> {
        let slot = norm_slot(field)?;
        self.doc_norms(doc_id).map(|norms| norms[slot])
    }
}

fn read_part<T, F>(input: Box<dyn StorageInput>, magic: u32, decode: F) -> Result<T>
where
    F: FnOnce(&mut StructReader<Box<dyn StorageInput>>) -> Result<T>,
{
    let mut reader = StructReader::new(input)?;
    reader.read_header(magic, SEGMENT_FORMAT_VERSION)?;
    let value = decode(&mut reader)?;
    reader.verify_checksum()?;
    Ok(value)
}
