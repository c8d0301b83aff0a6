//! Embedding infrastructure for semantic matching.
//!
//! The [`EmbeddingService`] trait abstracts text-to-vector conversion so the
//! engine can run against a local candle model, a stub in tests, or nothing at
//! all (degraded mode). [`LocalEmbeddingService`] implements it with a BERT
//! sentence encoder.
//!
//! All text passes through [`normalize_text`] before embedding: Unicode
//! lowercasing, whitespace collapsing, and a deterministic character cap.
//! Same input text, same model, same vector.

pub mod candle_backend;
pub mod config;
pub mod model;

use async_trait::async_trait;

use crate::LiedwyserError;

pub use config::EmbedderConfig;
pub use model::LocalEmbeddingService;

/// Maximum characters fed to the model after normalization.
///
/// Over-length text is truncated at this char count (never mid-scalar), a
/// fixed rule so repeated embeddings of the same song are reproducible.
pub const MAX_EMBED_CHARS: usize = 4096;

/// Normalize text before embedding.
///
/// Lowercases, collapses whitespace runs to single spaces, trims, and
/// truncates to [`MAX_EMBED_CHARS`] characters. Returns an empty string for
/// whitespace-only input; callers treat that as unembeddable.
pub fn normalize_text(text: &str) -> String {
    let collapsed = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.chars().take(MAX_EMBED_CHARS).collect()
}

/// Service trait for generating text embeddings.
///
/// Implementations must be deterministic: the same text always yields the
/// same vector for a fixed model version.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// Fails with [`LiedwyserError::Embedding`] if the text is empty after
    /// normalization or the model is unavailable.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, LiedwyserError>;

    /// Generate embeddings for multiple texts in one pass.
    ///
    /// Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LiedwyserError>;

    /// Embedding dimensionality (384 for the default MiniLM model).
    fn dimensions(&self) -> usize;

    /// Whether the model loaded and embed calls can succeed.
    ///
    /// False means degraded mode: recommendations are unavailable but the
    /// process stays alive.
    fn is_available(&self) -> bool;
}

/// No-op embedding service for contexts without a model.
///
/// Always reports unavailable and fails embed operations.
#[derive(Debug, Default)]
pub struct NoopEmbeddingService;

impl NoopEmbeddingService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingService for NoopEmbeddingService {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, LiedwyserError> {
        Err(LiedwyserError::Embedding(
            "embedding service is not available (noop)".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LiedwyserError> {
        Err(LiedwyserError::Embedding(
            "embedding service is not available (noop)".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        384
    }

    fn is_available(&self) -> bool {
        false
    }
}
