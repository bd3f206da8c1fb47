//! Elapsed-time samples of an index build.
//!
//! The build calls a [`MetricsSink`] at a fixed document cadence and once
//! more after the final commit. What happens to the samples is up to the
//! sink: [`TimeFileSink`] appends them to a text file, one integer per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{CrawldexError, Result};

/// Receives elapsed-time samples.
pub trait MetricsSink: Send {
    /// Record sample number `sample_index` (starting at 0), taken
    /// `elapsed_ms` milliseconds after the build started.
    fn record(&mut self, sample_index: u64, elapsed_ms: u64) -> Result<()>;

    /// Flush anything buffered. Called once at the end of a build.
    fn finish(&mut self) -> Result<()>;
}

/// Writes each sample as a decimal integer on its own line.
#[derive(Debug)]
pub struct TimeFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TimeFileSink {
    /// Create or truncate the sample file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            CrawldexError::path(format!(
                "Cannot create time log {}: {e}",
                path.display()
            ))
        })?;
        Ok(TimeFileSink {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for TimeFileSink {
    fn record(&mut self, _sample_index: u64, elapsed_ms: u64) -> Result<()> {
        writeln!(self.writer, "{elapsed_ms}")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        log::debug!("Time samples written to {}", self.path.display());
        Ok(())
    }
}

/// Keeps samples in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Vec<(u64, u64)>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(sample_index, elapsed_ms)` pairs in order.
    pub fn samples(&self) -> &[(u64, u64)] {
        &self.samples
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl MetricsSink for MemorySink {
    fn record(&mut self, sample_index: u64, elapsed_ms: u64) -> Result<()> {
        self.samples.push((sample_index, elapsed_ms));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&mut self, _sample_index: u64, _elapsed_ms: u64) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_time_file_sink() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("time.txt");
        std::fs::write(&path, "stale\n").unwrap();

        let mut sink = TimeFileSink::create(&path).unwrap();
        sink.record(0, 12).unwrap();
        sink.record(1, 340).unwrap();
        sink.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "12\n340\n");
        assert_eq!(sink.path(), path.as_path());
    }

    #[test]
    fn test_time_file_sink_bad_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("time.txt");
        assert!(matches!(
            TimeFileSink::create(path),
            Err(CrawldexError::Path(_))
        ));
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.record(0, 5).unwrap();
        sink.record(1, 9).unwrap();
        assert!(!sink.is_finished());
        sink.finish().unwrap();
        assert!(sink.is_finished());
        assert_eq!(sink.samples(), &[(0, 5), (1, 9)]);
    }
}
