//! Recommendation orchestration: query in, ranked songs out.
//!
//! Ties the corpus store, embedder, and cache together. Song vectors are
//! filled lazily: a query embeds only the songs the cache is missing for the
//! current corpus version, then every later query is pure cache reads.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::EmbeddingCache;
use crate::corpus::{Corpus, CorpusStore};
use crate::embedding::{normalize_text, EmbeddingService};
use crate::services::rank::{rank, SongVector};
use crate::LiedwyserError;

/// Default number of results returned.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound on a single embedding pass (query or batch lazy-fill).
const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Recognized recommendation options.
#[derive(Debug, Clone)]
pub struct RecommendOptions {
    /// Maximum results returned.
    pub top_k: usize,
    /// Filter floor applied after ranking, before truncation.
    pub min_score: f32,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: 0.0,
        }
    }
}

/// What the presentation layer gets back: display fields plus the score,
/// never the internal vectors.
#[derive(Debug, Clone, Serialize)]
pub struct SongView {
    pub id: String,
    pub title: String,
    pub score: f32,
    pub number: Option<u32>,
    pub category: Option<String>,
}

/// The recommendation engine, constructed once at startup and shared.
pub struct RecommendationService {
    store: Arc<CorpusStore>,
    embedder: Arc<dyn EmbeddingService>,
    cache: Arc<EmbeddingCache>,
    embed_timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        store: Arc<CorpusStore>,
        embedder: Arc<dyn EmbeddingService>,
        cache: Arc<EmbeddingCache>,
    ) -> Self {
        Self {
            store,
            embedder,
            cache,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    /// Override the embedding timeout (mainly for tests).
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Recommend songs for a free-text query.
    ///
    /// Empty and whitespace-only queries fail with
    /// [`LiedwyserError::InvalidQuery`]; an unavailable or timed-out model
    /// fails with [`LiedwyserError::Embedding`]. No sufficiently similar song
    /// is a normal outcome: `Ok(vec![])`, not an error.
    pub async fn recommend(
        &self,
        query_text: &str,
        options: &RecommendOptions,
    ) -> Result<Vec<SongView>, LiedwyserError> {
        let normalized = normalize_text(query_text);
        if normalized.is_empty() {
            return Err(LiedwyserError::InvalidQuery(
                "query is empty or whitespace-only".to_string(),
            ));
        }

        let corpus = self.store.snapshot();
        if corpus.is_empty() {
            return Ok(vec![]);
        }

        let query_vector = self.embed_bounded(&normalized).await?;
        let song_vectors = self.song_vectors(&corpus).await?;
        let ranked = rank(&query_vector, &song_vectors);

        let results: Vec<SongView> = ranked
            .into_iter()
            .filter(|candidate| candidate.score >= options.min_score)
            .take(options.top_k)
            .filter_map(|candidate| {
                corpus.get(&candidate.id).map(|song| SongView {
                    id: song.id.clone(),
                    title: song.title.clone(),
                    score: candidate.score,
                    number: song.metadata.number,
                    category: song.metadata.category.clone(),
                })
            })
            .collect();

        debug!(
            query_chars = normalized.len(),
            results = results.len(),
            "Recommendation served"
        );
        Ok(results)
    }

    /// Precompute and cache every missing song vector for the current corpus
    /// version, dropping stale partitions. Returns how many vectors were
    /// computed.
    pub async fn warm(&self) -> Result<usize, LiedwyserError> {
        let corpus = self.store.snapshot();
        let before = self.cache.count_for_version(corpus.version());
        self.song_vectors(&corpus).await?;
        let computed = corpus.len() - before;
        let dropped = self.cache.invalidate_all_except(corpus.version());
        info!(computed, dropped, "Embedding cache warmed");
        Ok(computed)
    }

    /// Song vectors for the whole corpus, in insertion order, lazily filling
    /// cache misses with a single batch embedding pass.
    async fn song_vectors(&self, corpus: &Corpus) -> Result<Vec<SongVector>, LiedwyserError> {
        let version = corpus.version();
        let mut vectors: Vec<Option<Vec<f32>>> = Vec::with_capacity(corpus.len());
        let mut missing: Vec<usize> = Vec::new();

        for (index, song) in corpus.songs().iter().enumerate() {
            match self.cache.get(version, &song.id) {
                Some(vector) => vectors.push(Some(vector)),
                None => {
                    vectors.push(None);
                    missing.push(index);
                }
            }
        }

        if !missing.is_empty() {
            debug!(misses = missing.len(), version, "Filling embedding cache");
            let texts: Vec<String> = missing
                .iter()
                .map(|&i| corpus.songs()[i].text.clone())
                .collect();
            let embedded = self.embed_batch_bounded(&texts).await?;
            for (&index, vector) in missing.iter().zip(embedded) {
                let song = &corpus.songs()[index];
                self.cache.put(version, &song.id, vector.clone());
                vectors[index] = Some(vector);
            }
        }

        Ok(corpus
            .songs()
            .iter()
            .zip(vectors)
            .filter_map(|(song, vector)| {
                vector.map(|vector| SongVector {
                    id: song.id.clone(),
                    vector,
                })
            })
            .collect())
    }

    async fn embed_bounded(&self, text: &str) -> Result<Vec<f32>, LiedwyserError> {
        tokio::time::timeout(self.embed_timeout, self.embedder.embed_text(text))
            .await
            .map_err(|_| {
                LiedwyserError::Embedding(format!(
                    "embedding timed out after {:?}",
                    self.embed_timeout
                ))
            })?
    }

    async fn embed_batch_bounded(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LiedwyserError> {
        tokio::time::timeout(self.embed_timeout, self.embedder.embed_batch(texts))
            .await
            .map_err(|_| {
                LiedwyserError::Embedding(format!(
                    "batch embedding timed out after {:?}",
                    self.embed_timeout
                ))
            })?
    }
}
