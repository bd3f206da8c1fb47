//! Reading the crawl dump and cutting it into documents.
//!
//! A dump is plain UTF-8 text. Every line starting with the configured URL
//! prefix opens a document, the following line is its title and the lines up
//! to the next URL line are its content.

pub mod reader;
pub mod segmenter;

use std::path::Path;

use crate::config::SegmenterConfig;
use crate::document::Document;
use crate::error::Result;

pub use reader::CorpusReader;
pub use segmenter::{DocumentSegmenter, RawRecord};

/// Open `path` and stream its documents in file order.
pub fn read_documents<P: AsRef<Path>>(
    path: P,
    config: &SegmenterConfig,
) -> Result<impl Iterator<Item = Result<Document>>> {
    let reader = CorpusReader::open(path)?;
    let segmenter = DocumentSegmenter::new(reader.lines(), &config.url_prefix);
    Ok(segmenter.map(|record| record.map(RawRecord::into_document)))
}
