//! Corpus reader: a lazy line stream over the dump file.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::{CrawldexError, Result};

const READ_BUFFER_SIZE: usize = 1 << 16;

/// An opened corpus file.
///
/// Iterating consumes the reader; reopen the path to read it again. The file
/// handle is released when the line iterator is dropped.
#[derive(Debug)]
pub struct CorpusReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl CorpusReader {
    /// Open a corpus file for reading.
    ///
    /// Fails with a path error when `path` does not exist, is a directory or
    /// cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.is_dir() {
            return Err(CrawldexError::path(format!(
                "Corpus path is a directory: {}",
                path.display()
            )));
        }

        let file = File::open(&path).map_err(|e| {
            CrawldexError::path(format!("Cannot open corpus {}: {e}", path.display()))
        })?;

        Ok(CorpusReader {
            path,
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, file),
        })
    }

    /// The path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the reader and return its lines without terminators.
    pub fn lines(self) -> CorpusLines {
        CorpusLines {
            path: self.path,
            lines: self.reader.lines(),
            line_no: 0,
        }
    }
}

/// Iterator over the lines of a corpus file.
///
/// Yields an analysis error for a line that is not valid UTF-8.
#[derive(Debug)]
pub struct CorpusLines {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    line_no: usize,
}

impl Iterator for CorpusLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        let line_no = self.line_no;
        self.line_no += 1;

        Some(match line {
            Ok(mut line) => {
                if line_no == 0 && line.starts_with('\u{feff}') {
                    line.remove(0);
                }
                Ok(line)
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(CrawldexError::analysis(format!(
                "{} line {}: not valid UTF-8",
                self.path.display(),
                line_no + 1
            ))),
            Err(e) => Err(e.into()),
        })
    }
}
