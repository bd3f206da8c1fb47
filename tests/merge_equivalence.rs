use std::sync::Arc;

use crawldex::config::IndexWriterConfig;
use crawldex::document::{Document, Field};
use crawldex::index::merge_policy::NoMergePolicy;
use crawldex::index::reader::IndexReader;
use crawldex::index::writer::IndexWriter;
use crawldex::storage::memory::MemoryStorage;

const WORDS: [&str; 12] = [
    "rust", "crawl", "index", "segment", "merge", "posting", "norm", "term", "reddit", "thread",
    "comment", "vote",
];

fn documents() -> Vec<Document> {
    (0..40)
        .map(|i| {
            let content: Vec<&str> = (0..(i % 7 + 1)).map(|j| WORDS[(i * 5 + j * 3) % WORDS.len()]).collect();
            Document::new(
                format!("https://www.reddit.com/r/rust/{i}"),
                format!("{} {}", WORDS[i % WORDS.len()], WORDS[(i + 4) % WORDS.len()]),
                content.join(" "),
            )
        })
        .collect()
}

fn build(config: IndexWriterConfig, merging: bool) -> IndexReader {
    let storage = Arc::new(MemoryStorage::new());
    let mut writer = IndexWriter::with_storage(storage.clone(), config).unwrap();
    if !merging {
        writer = writer.with_merge_policy(Box::new(NoMergePolicy));
    }
    for doc in documents() {
        writer.add_document(doc).unwrap();
    }
    writer.commit().unwrap();
    IndexReader::with_storage(storage).unwrap()
}

fn assert_same_index(a: &IndexReader, b: &IndexReader) {
    assert_eq!(a.doc_count(), b.doc_count());
    assert!(a.documents().eq(b.documents()));
    for field in Field::ALL {
        let terms = a.terms(field);
        assert_eq!(terms, b.terms(field), "terms of {field}");
        for term in &terms {
            assert_eq!(
                a.postings(field, term).unwrap(),
                b.postings(field, term).unwrap(),
                "postings of {field}:{term}"
            );
        }
    }
    for field in Field::ANALYZED {
        assert_eq!(a.field_stats(field), b.field_stats(field));
        for doc in 0..a.doc_count() {
            assert_eq!(a.norm(field, doc).unwrap(), b.norm(field, doc).unwrap());
        }
    }
}

#[test]
fn test_merged_index_matches_single_segment_build() {
    let single = build(IndexWriterConfig::default(), true);
    assert_eq!(single.segment_count(), 1);

    let merged = build(
        IndexWriterConfig {
            max_buffered_docs: Some(2),
            min_merge_docs: 2,
            ..Default::default()
        },
        true,
    );
    // 20 flushes of 2 docs; merging keeps far fewer live segments.
    assert!(merged.segment_count() < 6, "{} segments", merged.segment_count());

    assert_same_index(&single, &merged);
}

#[test]
fn test_unmerged_segments_read_like_one() {
    let single = build(IndexWriterConfig::default(), true);
    let unmerged = build(
        IndexWriterConfig {
            max_buffered_docs: Some(3),
            use_compound_file: false,
            ..Default::default()
        },
        false,
    );
    assert_eq!(unmerged.segment_count(), 14);
    assert_same_index(&single, &unmerged);
}

#[test]
fn test_merge_order_is_stable() {
    let merged = build(
        IndexWriterConfig {
            max_buffered_docs: Some(1),
            min_merge_docs: 1,
            ..Default::default()
        },
        true,
    );
    let urls: Vec<String> = merged.documents().map(|d| d.url.clone()).collect();
    let expected: Vec<String> = documents().into_iter().map(|d| d.url).collect();
    assert_eq!(urls, expected);
}
