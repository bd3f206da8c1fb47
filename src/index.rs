//! Segmented inverted index.
//!
//! [`writer::IndexWriter`] builds an index from documents,
//! [`reader::IndexReader`] opens a committed one.

pub mod analyzed;
pub mod buffer;
pub mod compound;
pub mod dictionary;
pub mod manifest;
pub mod merge;
pub mod merge_policy;
pub mod posting;
pub mod reader;
pub mod segment;
pub mod writer;

pub use analyzed::{AnalyzedDocument, DocumentAnalyzer};
pub use merge_policy::{LogDocMergePolicy, MergePolicy, NoMergePolicy};
pub use reader::IndexReader;
pub use writer::{IndexWriter, WriterStats};
