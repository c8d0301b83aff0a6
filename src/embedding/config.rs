//! Embedder configuration: which model to load and where to cache it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default sentence-encoder model. 384 dimensions, small and fast — the same
/// family the corpus was originally matched with.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedding model configuration.
///
/// Loaded from `{data_path}/embedder.toml`, then the `LIEDWYSER_EMBEDDER` env
/// var (JSON), then defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// HuggingFace Hub repo id of a BERT sentence encoder.
    #[serde(default = "default_model")]
    pub model: String,
    /// Override for the model artifact cache directory.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cache_dir: None,
        }
    }
}

impl EmbedderConfig {
    /// Load embedder config with priority:
    /// 1. `{data_path}/embedder.toml`
    /// 2. `LIEDWYSER_EMBEDDER` env var (JSON)
    /// 3. Default (all-MiniLM-L6-v2)
    pub fn load(data_path: &Path) -> Self {
        let config_path = data_path.join("embedder.toml");
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(contents) => match toml::from_str::<EmbedderConfig>(&contents) {
                    Ok(config) => {
                        info!("Loaded embedder config from {}", config_path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!(
                            "Failed to parse {}: {}. Using default.",
                            config_path.display(),
                            e
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        "Failed to read {}: {}. Using default.",
                        config_path.display(),
                        e
                    );
                }
            }
        }

        if let Ok(json) = std::env::var("LIEDWYSER_EMBEDDER") {
            match serde_json::from_str::<EmbedderConfig>(&json) {
                Ok(config) => {
                    info!("Loaded embedder config from LIEDWYSER_EMBEDDER env");
                    return config;
                }
                Err(e) => {
                    warn!("Failed to parse LIEDWYSER_EMBEDDER: {}. Using default.", e);
                }
            }
        }

        EmbedderConfig::default()
    }
}
