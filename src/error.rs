//! Error types for the crawldex library.
//!
//! All errors are represented by the [`CrawldexError`] enum. The first four
//! variants are the failure kinds a build can abort with; the rest wrap
//! lower-level failures so they can be propagated with `?`.
//!
//! # Examples
//!
//! ```
//! use crawldex::error::{CrawldexError, Result};
//!
//! fn open_corpus() -> Result<()> {
//!     Err(CrawldexError::path("corpus file does not exist"))
//! }
//!
//! match open_corpus() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for crawldex operations.
#[derive(Error, Debug)]
pub enum CrawldexError {
    /// Missing or invalid corpus or index path.
    #[error("Path error: {0}")]
    Path(String),

    /// The index destination could not be initialized.
    #[error("Index creation error: {0}")]
    IndexCreation(String),

    /// A segment flush or merge failed while writing.
    #[error("Segment I/O error: {0}")]
    SegmentIo(String),

    /// Analysis errors (tokenizer construction, malformed field text).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Storage backend errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted data failed a magic, version or checksum check.
    #[error("Corrupt index: {0}")]
    Corrupt(String),

    /// Invalid argument or configuration value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with CrawldexError.
pub type Result<T> = std::result::Result<T, CrawldexError>;

impl CrawldexError {
    /// Create a new path error.
    pub fn path<S: Into<String>>(msg: S) -> Self {
        CrawldexError::Path(msg.into())
    }

    /// Create a new index creation error.
    pub fn index_creation<S: Into<String>>(msg: S) -> Self {
        CrawldexError::IndexCreation(msg.into())
    }

    /// Create a new segment I/O error.
    pub fn segment_io<S: Into<String>>(msg: S) -> Self {
        CrawldexError::SegmentIo(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        CrawldexError::Analysis(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        CrawldexError::Storage(msg.into())
    }

    /// Create a new corruption error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        CrawldexError::Corrupt(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        CrawldexError::InvalidArgument(msg.into())
    }

    /// Wrap any error raised while a segment was being written.
    ///
    /// Errors that already carry a more specific kind are kept as they are.
    pub fn into_segment_io(self, context: &str) -> Self {
        match self {
            CrawldexError::SegmentIo(_) | CrawldexError::Corrupt(_) => self,
            other => CrawldexError::SegmentIo(format!("{context}: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = CrawldexError::path("missing corpus");
        assert_eq!(error.to_string(), "Path error: missing corpus");

        let error = CrawldexError::index_creation("not a directory");
        assert_eq!(error.to_string(), "Index creation error: not a directory");

        let error = CrawldexError::segment_io("disk full");
        assert_eq!(error.to_string(), "Segment I/O error: disk full");

        let error = CrawldexError::analysis("bad pattern");
        assert_eq!(error.to_string(), "Analysis error: bad pattern");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = CrawldexError::from(io_error);

        match error {
            CrawldexError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_into_segment_io() {
        let io_error = CrawldexError::from(io::Error::other("write failed"));
        let wrapped = io_error.into_segment_io("flushing _0");
        assert!(matches!(wrapped, CrawldexError::SegmentIo(_)));
        assert!(wrapped.to_string().contains("flushing _0"));

        let corrupt = CrawldexError::corrupt("bad checksum").into_segment_io("merging");
        assert!(matches!(corrupt, CrawldexError::Corrupt(_)));
    }
}
