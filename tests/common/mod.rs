//! Shared test helpers: a deterministic stub embedder and corpus builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use liedwyser::cache::EmbeddingCache;
use liedwyser::corpus::{Corpus, CorpusStore, RawSongRecord};
use liedwyser::embedding::{normalize_text, EmbeddingService};
use liedwyser::services::RecommendationService;
use liedwyser::LiedwyserError;

/// Deterministic embedding stub.
///
/// Texts containing a preset keyword get that keyword's vector; anything else
/// gets a deterministic byte-derived fallback. Counts every text embedded so
/// tests can assert exact computation counts.
pub struct StubEmbedder {
    presets: Vec<(String, Vec<f32>)>,
    embedded: AtomicUsize,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::with_presets(vec![])
    }

    /// Keywords are matched against normalized text, first hit wins.
    pub fn with_presets(presets: Vec<(&str, Vec<f32>)>) -> Self {
        Self {
            presets: presets
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            embedded: AtomicUsize::new(0),
        }
    }

    /// Total number of texts embedded so far.
    pub fn embed_count(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    fn vector_for(&self, normalized: &str) -> Vec<f32> {
        for (keyword, vector) in &self.presets {
            if normalized.contains(keyword.as_str()) {
                return vector.clone();
            }
        }
        let mut acc = [0.0f32; 4];
        for (i, byte) in normalized.bytes().enumerate() {
            acc[i % 4] += f32::from(byte);
        }
        let norm: f32 = acc.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            acc.to_vec()
        } else {
            acc.iter().map(|x| x / norm).collect()
        }
    }
}

#[async_trait]
impl EmbeddingService for StubEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, LiedwyserError> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(LiedwyserError::Embedding(
                "text is empty after normalization".to_string(),
            ));
        }
        self.embedded.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(&normalized))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LiedwyserError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_text(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Build a raw record with lyrics verses.
pub fn record(id: &str, title: &str, verses: &[&str]) -> RawSongRecord {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": title,
        "lyrics": verses,
    }))
    .expect("valid record json")
}

/// Build a corpus directly from records, panicking on validation failure.
pub fn corpus(records: Vec<RawSongRecord>) -> Corpus {
    Corpus::from_records(records).expect("valid corpus").corpus
}

/// Wire a recommendation service over an in-memory cache and the given
/// embedder, returning all three shared handles.
pub fn service_with(
    songs: Vec<RawSongRecord>,
    embedder: Arc<StubEmbedder>,
) -> (
    RecommendationService,
    Arc<CorpusStore>,
    Arc<EmbeddingCache>,
) {
    let store = Arc::new(CorpusStore::new(corpus(songs)));
    let cache = Arc::new(EmbeddingCache::in_memory());
    let service = RecommendationService::new(store.clone(), embedder, cache.clone());
    (service, store, cache)
}

/// Write a corpus JSON file into `dir` and return its path.
pub fn write_corpus_file(
    dir: &std::path::Path,
    name: &str,
    records: &serde_json::Value,
) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(records).unwrap()).unwrap();
    path
}
