//! Criterion benchmarks for crawldex.
//!
//! - Text analysis of title and content fields
//! - Segment building and merging
//! - Corpus segmentation

use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use crawldex::analysis::analyzer::Analyzer;
use crawldex::analysis::analyzer::standard::StandardAnalyzer;
use crawldex::config::{IndexWriterConfig, SegmenterConfig};
use crawldex::corpus;
use crawldex::document::Document;
use crawldex::index::writer::IndexWriter;
use crawldex::storage::memory::MemoryStorage;
use std::hint::black_box;

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<Document> {
    let words = [
        "reddit", "thread", "comment", "upvote", "rust", "crawl", "index", "segment", "merge",
        "posting", "the", "and", "search", "engine", "borrow", "checker", "lifetime", "async",
        "tokio", "cargo", "crate", "release", "compiler", "error",
    ];

    let mut documents = Vec::with_capacity(count);
    for i in 0..count {
        let doc_length = 50 + (i % 100); // Variable length documents
        let content: Vec<&str> = (0..doc_length)
            .map(|j| words[(i * 7 + j * 13) % words.len()])
            .collect();
        documents.push(Document::new(
            format!("https://www.reddit.com/r/rust/comments/{i}"),
            format!("{} {} {}", words[i % words.len()], words[(i + 3) % words.len()], i),
            content.join(" "),
        ));
    }

    documents
}

/// Benchmark text analysis.
fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");

    let analyzer = StandardAnalyzer::new().unwrap();
    let documents = generate_test_documents(1000);

    group.bench_function("analyze_single_document", |b| {
        b.iter(|| {
            let result = analyzer.analyze(black_box(&documents[0].content));
            black_box(result)
        })
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("analyze_batch_documents", |b| {
        b.iter(|| {
            for doc in documents.iter().take(100) {
                let result = analyzer.analyze(black_box(&doc.content));
                let _ = black_box(result);
            }
        })
    });

    group.finish();
}

/// Benchmark indexing into memory storage.
fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexing");
    group.sample_size(20);

    let documents = generate_test_documents(1000);
    group.throughput(Throughput::Elements(documents.len() as u64));

    group.bench_function("single_segment", |b| {
        b.iter(|| {
            let storage = Arc::new(MemoryStorage::new());
            let mut writer =
                IndexWriter::with_storage(storage, IndexWriterConfig::default()).unwrap();
            for doc in &documents {
                writer.add_document(doc.clone()).unwrap();
            }
            black_box(writer.commit().unwrap())
        })
    });

    group.bench_function("bounded_buffer_with_merges", |b| {
        b.iter(|| {
            let storage = Arc::new(MemoryStorage::new());
            let config = IndexWriterConfig {
                max_buffered_docs: Some(50),
                min_merge_docs: 50,
                ..Default::default()
            };
            let mut writer = IndexWriter::with_storage(storage, config).unwrap();
            for doc in &documents {
                writer.add_document(doc.clone()).unwrap();
            }
            black_box(writer.commit().unwrap())
        })
    });

    group.finish();
}

/// Benchmark corpus segmentation.
fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("reddit.txt");
    let text: String = generate_test_documents(1000)
        .iter()
        .map(|d| format!("{}\n{}\n{}\n", d.url, d.title, d.content))
        .collect();
    std::fs::write(&path, text).unwrap();

    group.throughput(Throughput::Elements(1000));
    group.bench_function("read_documents", |b| {
        b.iter(|| {
            let count = corpus::read_documents(&path, &SegmenterConfig::default())
                .unwrap()
                .count();
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_text_analysis, bench_indexing, bench_segmentation);

criterion_main!(benches);
