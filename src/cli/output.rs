//! Output formatting for CLI commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::args::{CrawldexArgs, OutputFormat};
use crate::error::Result;
use crate::pipeline::BuildReport;

/// Results that have a human-readable rendering.
pub trait HumanOutput {
    /// Lines printed in human mode.
    fn human_lines(&self) -> Vec<String>;
}

/// Per-field statistics of a committed index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field: String,
    pub unique_terms: usize,
    pub docs_with_field: u64,
    pub average_length: f64,
}

/// Index statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_path: String,
    pub index_id: String,
    pub similarity: String,
    pub generation: u64,
    pub total_documents: u64,
    pub number_of_segments: usize,
    pub index_size_bytes: u64,
    pub committed_at: DateTime<Utc>,
    pub fields: Vec<FieldSummary>,
}

impl HumanOutput for BuildReport {
    fn human_lines(&self) -> Vec<String> {
        vec![
            format!("Number of doc: {}", self.doc_count),
            format!("Indexing time: {} total milliseconds", self.elapsed_ms),
        ]
    }
}

impl HumanOutput for IndexStats {
    fn human_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Index: {}", self.index_path),
            format!("Similarity: {}", self.similarity),
            format!("Documents: {}", self.total_documents),
            format!("Segments: {}", self.number_of_segments),
            format!("Size: {} bytes", self.index_size_bytes),
            format!("Committed: {}", self.committed_at.to_rfc3339()),
        ];
        for field in &self.fields {
            lines.push(format!(
                "  {}: {} terms, {} docs, avg length {:.2}",
                field.field, field.unique_terms, field.docs_with_field, field.average_length
            ));
        }
        lines
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &CrawldexArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: HumanOutput>(message: &str, result: &T, args: &CrawldexArgs) -> Result<()> {
    if args.verbosity() > 1 {
        println!("{message}");
        println!();
    }
    for line in result.human_lines() {
        println!("{line}");
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &CrawldexArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
