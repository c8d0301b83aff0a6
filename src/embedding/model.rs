//! Local embedding service backed by the candle BERT encoder.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::embedding::candle_backend::{fetch_model, select_device, SentenceEncoder};
use crate::embedding::{normalize_text, EmbedderConfig, EmbeddingService};
use crate::LiedwyserError;

/// Fallback dimensionality when the model failed to load (matches MiniLM/BGE-small).
const DEFAULT_DIMENSIONS: usize = 384;

/// Embedding service running a local sentence encoder.
///
/// Inference runs inside `spawn_blocking` since candle is synchronous and
/// CPU-bound. If the model cannot be loaded (e.g. offline first run) the
/// service constructs successfully but reports unavailable — degraded mode,
/// not a startup crash.
pub struct LocalEmbeddingService {
    encoder: Option<Arc<SentenceEncoder>>,
    dimensions: usize,
}

impl LocalEmbeddingService {
    /// Create the service, attempting to load the configured model.
    pub fn new(config: &EmbedderConfig) -> Self {
        let cache_dir = config.cache_dir.as_deref().map(std::path::Path::new);
        let loaded = fetch_model(&config.model, cache_dir)
            .and_then(|artifacts| SentenceEncoder::load(&artifacts, select_device()));

        match loaded {
            Ok(encoder) => {
                let dimensions = encoder.hidden_size();
                Self {
                    encoder: Some(Arc::new(encoder)),
                    dimensions,
                }
            }
            Err(e) => {
                warn!(
                    "Failed to load embedding model '{}': {}. \
                     Recommendations will be unavailable.",
                    config.model, e
                );
                Self {
                    encoder: None,
                    dimensions: DEFAULT_DIMENSIONS,
                }
            }
        }
    }

    fn encoder(&self) -> Result<Arc<SentenceEncoder>, LiedwyserError> {
        self.encoder.clone().ok_or_else(|| {
            LiedwyserError::Embedding("embedding model is not loaded".to_string())
        })
    }

    /// Normalize inputs, rejecting any that come out empty.
    fn prepare(texts: &[String]) -> Result<Vec<String>, LiedwyserError> {
        texts
            .iter()
            .map(|t| {
                let normalized = normalize_text(t);
                if normalized.is_empty() {
                    Err(LiedwyserError::Embedding(
                        "text is empty after normalization".to_string(),
                    ))
                } else {
                    Ok(normalized)
                }
            })
            .collect()
    }

    async fn run_encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LiedwyserError> {
        let encoder = self.encoder()?;
        tokio::task::spawn_blocking(move || {
            encoder
                .encode_batch(&texts)
                .map_err(|e| LiedwyserError::Embedding(format!("inference failed: {}", e)))
        })
        .await
        .map_err(|e| LiedwyserError::Embedding(format!("inference task failed: {}", e)))?
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddingService {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, LiedwyserError> {
        let prepared = Self::prepare(&[text.to_string()])?;
        let mut vectors = self.run_encode(prepared).await?;
        vectors
            .pop()
            .ok_or_else(|| LiedwyserError::Embedding("encoder returned no vector".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LiedwyserError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let prepared = Self::prepare(texts)?;
        let vectors = self.run_encode(prepared).await?;
        if vectors.len() != texts.len() {
            return Err(LiedwyserError::Embedding(format!(
                "encoder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn is_available(&self) -> bool {
        self.encoder.is_some()
    }
}
