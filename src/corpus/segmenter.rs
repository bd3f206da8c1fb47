//! Document segmenter: groups corpus lines into URL-delimited records.
//!
//! # Examples
//!
//! ```
//! use crawldex::corpus::DocumentSegmenter;
//! use crawldex::error::CrawldexError;
//!
//! let lines = [
//!     "https://www.reddit.com/1",
//!     "Hello World",
//!     "foo bar baz",
//!     "https://www.reddit.com/2",
//!     "Second Title",
//!     "qux quux",
//! ];
//! let lines = lines.iter().map(|l| Ok::<_, CrawldexError>(l.to_string()));
//! let docs: Vec<_> = DocumentSegmenter::new(lines, "https://www.reddit.com")
//!     .map(|record| record.unwrap().into_document())
//!     .collect();
//!
//! assert_eq!(docs.len(), 2);
//! assert_eq!(docs[0].title, "Hello World");
//! assert_eq!(docs[1].content, "qux quux");
//! ```

use crate::document::Document;
use crate::error::Result;

/// The lines of one document, from its URL line to the line before the next URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Zero-based line number of the URL line.
    pub start_line: usize,
    /// Zero-based line number of the last line of the record (inclusive).
    pub end_line: usize,
    /// The record's lines; the first one is the URL line.
    pub lines: Vec<String>,
}

impl RawRecord {
    /// Build the document: URL line, title line, and the rest concatenated.
    ///
    /// A record consisting of only its URL line has an empty title and content.
    pub fn into_document(self) -> Document {
        let mut lines = self.lines.into_iter();
        let url = lines.next().unwrap_or_default();
        let title = lines.next().unwrap_or_default();
        let content: String = lines.collect();
        Document {
            url,
            title,
            content,
        }
    }
}

/// Splits a line stream into [`RawRecord`]s at lines starting with a URL prefix.
///
/// Records are produced in file order without gaps or overlaps. Lines before
/// the first URL line belong to no record and are skipped. A stream with no
/// URL line yields nothing.
pub struct DocumentSegmenter<I> {
    lines: I,
    url_prefix: String,
    /// Next line number to be read from `lines`.
    line_no: usize,
    /// URL line that opens the next record, already read.
    pending: Option<(usize, String)>,
    done: bool,
}

impl<I> DocumentSegmenter<I>
where
    I: Iterator<Item = Result<String>>,
{
    /// Create a segmenter over `lines` using `url_prefix` as the boundary marker.
    pub fn new<S: Into<String>>(lines: I, url_prefix: S) -> Self {
        DocumentSegmenter {
            lines,
            url_prefix: url_prefix.into(),
            line_no: 0,
            pending: None,
            done: false,
        }
    }

    fn is_boundary(&self, line: &str) -> bool {
        line.starts_with(&self.url_prefix)
    }

    fn next_line(&mut self) -> Option<Result<(usize, String)>> {
        let line = self.lines.next()?;
        let line_no = self.line_no;
        self.line_no += 1;
        Some(line.map(|line| (line_no, line)))
    }

    /// Scan forward to the next URL line.
    fn find_next_url(&mut self) -> Result<Option<(usize, String)>> {
        let mut skipped = 0usize;
        while let Some(line) = self.next_line() {
            let (line_no, line) = line?;
            if self.is_boundary(&line) {
                if skipped > 0 {
                    log::warn!("Skipped {skipped} lines before the first document");
                }
                return Ok(Some((line_no, line)));
            }
            skipped += 1;
        }
        if skipped > 0 {
            log::warn!("No document boundary found in {skipped} lines");
        }
        Ok(None)
    }

    fn next_record(&mut self) -> Result<Option<RawRecord>> {
        let (start_line, url) = match self.pending.take() {
            Some(pending) => pending,
            None => match self.find_next_url()? {
                Some(first) => first,
                None => return Ok(None),
            },
        };

        let mut lines = vec![url];
        while let Some(line) = self.next_line() {
            let (line_no, line) = line?;
            if self.is_boundary(&line) {
                self.pending = Some((line_no, line));
                break;
            }
            lines.push(line);
        }

        Ok(Some(RawRecord {
            start_line,
            end_line: start_line + lines.len() - 1,
            lines,
        }))
    }
}

impl<I> Iterator for DocumentSegmenter<I>
where
    I: Iterator<Item = Result<String>>,
{
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
