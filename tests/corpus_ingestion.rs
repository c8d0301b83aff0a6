//! Corpus ingestion from disk: parsing, validation, versioning, reload.

mod common;

use common::write_corpus_file;
use liedwyser::corpus::CorpusStore;
use liedwyser::LiedwyserError;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_load_valid_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus_file(
        dir.path(),
        "songs.json",
        &json!([
            {"id": "lied-1", "title": "Môrelied", "lyrics": ["prys die dag", "lig breek aan"], "number": 1},
            {"id": "lied-2", "title": "Aandlied", "lyrics": ["rus in vrede"], "category": "aand"},
        ]),
    );

    let store = CorpusStore::load(&path).unwrap();
    let corpus = store.snapshot();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.songs()[0].title, "Môrelied");
    assert_eq!(corpus.songs()[0].metadata.number, Some(1));
    assert_eq!(corpus.songs()[1].metadata.category.as_deref(), Some("aand"));
    assert_eq!(corpus.version().len(), 64); // hex sha-256
}

#[test]
fn test_missing_file_is_ingestion_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = CorpusStore::load(&dir.path().join("nope.json"));
    assert!(matches!(result, Err(LiedwyserError::Ingestion(_))));
}

#[test]
fn test_unparsable_source_is_ingestion_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("songs.json");
    std::fs::write(&path, "this is not json").unwrap();
    let result = CorpusStore::load(&path);
    assert!(matches!(result, Err(LiedwyserError::Ingestion(_))));
}

#[test]
fn test_duplicate_id_fails_naming_the_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus_file(
        dir.path(),
        "songs.json",
        &json!([
            {"id": "lied-1", "lyrics": ["eerste"]},
            {"id": "lied-1", "lyrics": ["tweede"]},
        ]),
    );
    match CorpusStore::load(&path) {
        Err(LiedwyserError::Validation { id, .. }) => assert_eq!(id, "lied-1"),
        other => panic!("expected Validation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_malformed_records_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus_file(
        dir.path(),
        "songs.json",
        &json!([
            {"id": "keeper", "lyrics": ["goeie lied"]},
            {"title": "geen id nie", "lyrics": ["verse"]},
            {"id": "leeg", "lyrics": []},
        ]),
    );
    let store = CorpusStore::load(&path).unwrap();
    let corpus = store.snapshot();
    assert_eq!(corpus.len(), 1);
    assert!(corpus.get("keeper").is_some());
}

#[test]
fn test_reorder_keeps_version_content_change_rolls_it() {
    let dir = tempfile::tempdir().unwrap();
    let original = write_corpus_file(
        dir.path(),
        "a.json",
        &json!([
            {"id": "x", "lyrics": ["een"]},
            {"id": "y", "lyrics": ["twee"]},
        ]),
    );
    let reordered = write_corpus_file(
        dir.path(),
        "b.json",
        &json!([
            {"id": "y", "lyrics": ["twee"]},
            {"id": "x", "lyrics": ["een"]},
        ]),
    );
    let edited = write_corpus_file(
        dir.path(),
        "c.json",
        &json!([
            {"id": "x", "lyrics": ["een, aangepas"]},
            {"id": "y", "lyrics": ["twee"]},
        ]),
    );

    let v_original = CorpusStore::load(&original).unwrap().snapshot().version().to_string();
    let v_reordered = CorpusStore::load(&reordered).unwrap().snapshot().version().to_string();
    let v_edited = CorpusStore::load(&edited).unwrap().snapshot().version().to_string();

    assert_eq!(v_original, v_reordered);
    assert_ne!(v_original, v_edited);
}

#[test]
fn test_reload_swaps_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_corpus_file(
        dir.path(),
        "a.json",
        &json!([{"id": "x", "lyrics": ["een"]}]),
    );
    let second = write_corpus_file(
        dir.path(),
        "b.json",
        &json!([
            {"id": "x", "lyrics": ["een"]},
            {"id": "y", "lyrics": ["twee"]},
        ]),
    );

    let store = CorpusStore::load(&first).unwrap();
    let before = store.snapshot();
    let after = store.reload(&second).unwrap();

    assert_eq!(before.len(), 1); // old snapshot unaffected
    assert_eq!(after.len(), 2);
    assert_eq!(store.snapshot().len(), 2);
    assert_ne!(before.version(), after.version());
}

#[test]
fn test_failed_reload_keeps_previous_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_corpus_file(
        dir.path(),
        "a.json",
        &json!([{"id": "x", "lyrics": ["een"]}]),
    );
    let store = CorpusStore::load(&first).unwrap();
    let result = store.reload(&dir.path().join("missing.json"));
    assert!(result.is_err());
    assert_eq!(store.snapshot().len(), 1);
}
