use std::fs;
use std::path::{Path, PathBuf};

use crawldex::config::IndexerConfig;
use crawldex::document::Field;
use crawldex::error::CrawldexError;
use crawldex::index::reader::IndexReader;
use crawldex::metrics::MemorySink;
use crawldex::pipeline::Indexer;
use crawldex::similarity::Similarity;
use tempfile::TempDir;

const TWO_DOCS: &str = "https://www.reddit.com/1\nHello World\nfoo bar baz\nhttps://www.reddit.com/2\nSecond Title\nqux quux\n";

fn write_corpus(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn config(dir: &Path, corpus_path: PathBuf) -> IndexerConfig {
    IndexerConfig {
        corpus_path,
        index_path: dir.join("index"),
        time_log_path: Some(dir.join("time.txt")),
        ..Default::default()
    }
}

#[test]
fn test_two_document_corpus() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), write_corpus(dir.path(), "reddit.txt", TWO_DOCS));

    let report = Indexer::new(config.clone()).unwrap().run().unwrap();
    assert_eq!(report.doc_count, 2);

    let reader = IndexReader::open(&config.index_path).unwrap();
    assert_eq!(reader.doc_count(), 2);

    let doc0 = reader.document(0).unwrap();
    assert_eq!(doc0.url, "https://www.reddit.com/1");
    assert_eq!(doc0.title, "Hello World");
    assert_eq!(doc0.content, "foo bar baz");

    let doc1 = reader.document(1).unwrap();
    assert_eq!(doc1.url, "https://www.reddit.com/2");
    assert_eq!(doc1.title, "Second Title");
    assert_eq!(doc1.content, "qux quux");

    assert_eq!(reader.doc_freq(Field::Title, "hello"), 1);
    assert_eq!(reader.doc_freq(Field::Content, "quux"), 1);
    assert_eq!(reader.doc_freq(Field::Url, "https://www.reddit.com/2"), 1);

    // Fewer than a full interval of documents: only the completion sample.
    let samples = fs::read_to_string(dir.path().join("time.txt")).unwrap();
    assert_eq!(samples.lines().count(), 1);
}

#[test]
fn test_content_lines_are_concatenated() {
    let dir = TempDir::new().unwrap();
    let text = "https://www.reddit.com/a\nTitle\nline one\nline two\n\nline three\nhttps://www.reddit.com/b\n";
    let config = config(dir.path(), write_corpus(dir.path(), "reddit.txt", text));
    Indexer::new(config.clone()).unwrap().run().unwrap();

    let reader = IndexReader::open(&config.index_path).unwrap();
    assert_eq!(reader.doc_count(), 2);
    assert_eq!(reader.document(0).unwrap().content, "line oneline twoline three");

    let url_only = reader.document(1).unwrap();
    assert_eq!(url_only.title, "");
    assert_eq!(url_only.content, "");
}

#[test]
fn test_corpus_without_urls() {
    let dir = TempDir::new().unwrap();
    let text = "no documents here\njust text\n";
    let config = config(dir.path(), write_corpus(dir.path(), "reddit.txt", text));

    let report = Indexer::new(config.clone()).unwrap().run().unwrap();
    assert_eq!(report.doc_count, 0);
    let reader = IndexReader::open(&config.index_path).unwrap();
    assert_eq!(reader.doc_count(), 0);
    assert_eq!(reader.segment_count(), 0);
}

#[test]
fn test_rebuild_leaves_no_residue() {
    let dir = TempDir::new().unwrap();
    let big: String = (0..50)
        .map(|i| format!("https://www.reddit.com/old/{i}\nOld {i}\nstale words {i}\n"))
        .collect();
    let mut first = config(dir.path(), write_corpus(dir.path(), "old.txt", &big));
    first.writer.max_buffered_docs = Some(7);
    first.writer.use_compound_file = false;
    Indexer::new(first.clone()).unwrap().run().unwrap();
    assert_eq!(IndexReader::open(&first.index_path).unwrap().doc_count(), 50);

    let second = config(dir.path(), write_corpus(dir.path(), "new.txt", TWO_DOCS));
    Indexer::new(second.clone()).unwrap().run().unwrap();

    let reader = IndexReader::open(&second.index_path).unwrap();
    assert_eq!(reader.doc_count(), 2);
    assert!(reader.terms(Field::Content).iter().all(|t| t != "stale"));

    let mut files: Vec<String> = fs::read_dir(&second.index_path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["seg_000000.cfs", "segments.json"]);
}

#[test]
fn test_similarity_only_changes_norms() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(
        dir.path(),
        "reddit.txt",
        "https://www.reddit.com/1\nRust news\nrust is fast and rust is safe\nhttps://www.reddit.com/2\nOther\nshort post\n",
    );

    let mut bm25 = config(dir.path(), corpus.clone());
    bm25.index_path = dir.path().join("bm25");
    bm25.writer.similarity = Similarity::bm25();
    let mut tfidf = config(dir.path(), corpus);
    tfidf.index_path = dir.path().join("tfidf");
    tfidf.writer.similarity = Similarity::ClassicTfIdf;

    Indexer::new(bm25.clone()).unwrap().run().unwrap();
    Indexer::new(tfidf.clone()).unwrap().run().unwrap();

    let a = IndexReader::open(&bm25.index_path).unwrap();
    let b = IndexReader::open(&tfidf.index_path).unwrap();
    assert_eq!(a.doc_count(), b.doc_count());
    assert!(a.documents().eq(b.documents()));
    for field in Field::ALL {
        assert_eq!(a.terms(field), b.terms(field));
        for term in a.terms(field) {
            assert_eq!(a.postings(field, &term).unwrap(), b.postings(field, &term).unwrap());
        }
    }

    // "rust fast rust safe" after stop words: four tokens.
    assert_eq!(a.norm(Field::Content, 0).unwrap(), 4.0);
    assert_eq!(b.norm(Field::Content, 0).unwrap(), 0.5);
    assert_eq!(a.similarity(), Similarity::bm25());
    assert_eq!(b.similarity(), Similarity::ClassicTfIdf);
}

#[test]
fn test_metrics_cadence() {
    let dir = TempDir::new().unwrap();
    let text: String = (0..2500)
        .map(|i| format!("https://www.reddit.com/{i}\nt{i}\nc\n"))
        .collect();
    let mut config = config(dir.path(), write_corpus(dir.path(), "reddit.txt", &text));
    config.time_log_path = None;

    let mut sink = MemorySink::new();
    let report = Indexer::new(config).unwrap().run_with_sink(&mut sink).unwrap();
    assert_eq!(report.doc_count, 2500);

    // At 1000 and 2000 documents, then at completion.
    assert_eq!(sink.samples().len(), 3);
    let elapsed: Vec<u64> = sink.samples().iter().map(|(_, ms)| *ms).collect();
    assert!(elapsed.windows(2).all(|w| w[0] <= w[1]));
    assert!(sink.is_finished());
}

#[test]
fn test_missing_corpus_is_a_path_error() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), dir.path().join("missing.txt"));
    let err = Indexer::new(config.clone()).unwrap().run().unwrap_err();
    assert!(matches!(err, CrawldexError::Path(_)));
    assert!(!config.index_path.join("segments.json").exists());
}
