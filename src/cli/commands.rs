//! Command implementations for the crawldex CLI.

use std::path::Path;

use crate::cli::args::{BuildArgs, Command, CrawldexArgs, StatsArgs};
use crate::cli::output::{FieldSummary, IndexStats, output_result};
use crate::document::Field;
use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::pipeline::Indexer;

/// Execute the command described by the parsed arguments.
pub fn execute_command(args: CrawldexArgs) -> Result<()> {
    match &args.command {
        None => build_index(&args.build, &args),
        Some(Command::Stats(stats)) => show_stats(stats, &args),
    }
}

/// Build an index from a crawl dump.
fn build_index(build: &BuildArgs, cli_args: &CrawldexArgs) -> Result<()> {
    let config = build.to_config()?;
    if cli_args.verbosity() > 1 {
        println!("Indexing: {}", config.corpus_path.display());
        println!("Into: {}", config.index_path.display());
        println!("Similarity: {}", config.writer.similarity);
    }

    let report = Indexer::new(config)?.run()?;
    output_result("Index build complete", &report, cli_args)
}

/// Show statistics of a committed index.
fn show_stats(args: &StatsArgs, cli_args: &CrawldexArgs) -> Result<()> {
    let stats = collect_stats(&args.index_path)?;
    output_result("Index statistics", &stats, cli_args)
}

/// Gather [`IndexStats`] for the index at `path`.
pub fn collect_stats(path: &Path) -> Result<IndexStats> {
    let reader = IndexReader::open(path)?;
    let manifest = reader.manifest();

    let fields = Field::ALL
        .iter()
        .map(|&field| {
            let unique_terms = reader.terms(field).len();
            let (docs_with_field, average_length) = if field.is_analyzed() {
                let stats = reader.field_stats(field);
                (stats.docs_with_field, stats.avg_length() as f64)
            } else {
                (reader.doc_count(), 1.0)
            };
            FieldSummary {
                field: field.name().to_string(),
                unique_terms,
                docs_with_field,
                average_length,
            }
        })
        .collect();

    Ok(IndexStats {
        index_path: path.display().to_string(),
        index_id: manifest.index_id.to_string(),
        similarity: manifest.similarity.to_string(),
        generation: manifest.generation,
        total_documents: reader.doc_count(),
        number_of_segments: reader.segment_count(),
        index_size_bytes: reader.size_in_bytes()?,
        committed_at: manifest.committed_at,
        fields,
    })
}
