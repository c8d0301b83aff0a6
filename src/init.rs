//! Shared initialization: constructs the store, embedder, cache, and service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::EmbeddingCache;
use crate::corpus::CorpusStore;
use crate::embedding::{EmbedderConfig, EmbeddingService, LocalEmbeddingService};
use crate::services::RecommendationService;

/// Application context holding the engine's shared components.
///
/// Constructed once at startup and passed explicitly — no ambient globals.
pub struct AppContext {
    pub data_path: PathBuf,
    pub corpus_path: PathBuf,
    pub store: Arc<CorpusStore>,
    pub embedding_service: Arc<dyn EmbeddingService>,
    pub cache: Arc<EmbeddingCache>,
    pub recommender: Arc<RecommendationService>,
}

impl AppContext {
    /// Initialize the application context.
    ///
    /// Data path priority: explicit path > LIEDWYSER_DATA_PATH env >
    /// ./.liedwyser (if it exists) > ~/.liedwyser. A bad corpus source is
    /// fatal here, before anything is served; an unavailable embedding model
    /// or cache store is not.
    pub fn new(corpus_path: PathBuf, explicit_data_path: Option<PathBuf>) -> Result<Self> {
        let data_path = explicit_data_path
            .or_else(|| std::env::var("LIEDWYSER_DATA_PATH").ok().map(PathBuf::from))
            .or_else(|| {
                let local_path = Path::new(".liedwyser");
                if local_path.is_dir() {
                    Some(local_path.to_path_buf())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".liedwyser"))
                    .unwrap_or_else(|| PathBuf::from(".liedwyser"))
            });

        tracing::info!("Using data path: {}", data_path.display());

        let store = Arc::new(
            CorpusStore::load(&corpus_path)
                .with_context(|| format!("loading corpus from {}", corpus_path.display()))?,
        );

        let cache = Arc::new(EmbeddingCache::open(&data_path.join("cache")));

        tracing::info!("Initializing embedding model...");
        let embedder_config = EmbedderConfig::load(&data_path);
        let embedding_service: Arc<dyn EmbeddingService> =
            Arc::new(LocalEmbeddingService::new(&embedder_config));

        if embedding_service.is_available() {
            tracing::info!(
                "Embedding model loaded ({} dimensions)",
                embedding_service.dimensions()
            );
        } else {
            tracing::warn!("Embedding model not available — running degraded");
        }

        let recommender = Arc::new(RecommendationService::new(
            store.clone(),
            embedding_service.clone(),
            cache.clone(),
        ));

        Ok(Self {
            data_path,
            corpus_path,
            store,
            embedding_service,
            cache,
            recommender,
        })
    }
}
