//! Candle-based BERT inference for sentence embeddings.
//!
//! Pure-Rust ML runtime. [`SentenceEncoder`] wraps a `BertModel` and produces
//! mean-pooled, L2-normalized sentence vectors, compatible with MiniLM and
//! BGE sentence-encoder checkpoints.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{LayerNorm, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};

/// Local paths of the model artifacts needed for inference.
pub struct ModelArtifacts {
    pub config_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub weights_path: PathBuf,
}

/// Fetch model artifacts from HuggingFace Hub.
///
/// `hf_hub::api::sync::Api` caches under `~/.cache/huggingface/hub/`, so only
/// the first run hits the network. Synchronous I/O — call from
/// `spawn_blocking`.
pub fn fetch_model(repo_id: &str, _cache_dir: Option<&Path>) -> Result<ModelArtifacts> {
    let api = hf_hub::api::sync::Api::new().context("Failed to initialize HuggingFace Hub API")?;
    let repo = api.model(repo_id.to_string());

    Ok(ModelArtifacts {
        config_path: repo
            .get("config.json")
            .context("Failed to download config.json")?,
        tokenizer_path: repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer.json")?,
        weights_path: repo
            .get("model.safetensors")
            .context("Failed to download model.safetensors")?,
    })
}

/// Select the best available compute device.
///
/// Tries Metal (macOS) or CUDA if the corresponding feature is enabled,
/// probing layer-norm support first since BERT requires it. Falls back to CPU.
pub fn select_device() -> Device {
    #[cfg(target_os = "macos")]
    {
        if let Ok(device) = Device::new_metal(0) {
            if probe_layer_norm(&device) {
                tracing::info!("Using Metal GPU for inference");
                return device;
            }
            tracing::warn!("Metal GPU available but layer-norm not supported, falling back to CPU");
        }
    }
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            if probe_layer_norm(&device) {
                tracing::info!("Using CUDA GPU for inference");
                return device;
            }
            tracing::warn!("CUDA GPU available but layer-norm not supported, falling back to CPU");
        }
    }
    tracing::info!("Using CPU for inference");
    Device::Cpu
}

fn probe_layer_norm(device: &Device) -> bool {
    (|| -> candle_core::Result<()> {
        let weight = Tensor::ones(4, DType::F32, device)?;
        let bias = Tensor::zeros(4, DType::F32, device)?;
        let ln = LayerNorm::new(weight, bias, 1e-5);
        let input = Tensor::randn(0f32, 1.0, (1, 4), device)?;
        let _ = ln.forward(&input)?;
        Ok(())
    })()
    .is_ok()
}

/// BERT sentence encoder.
///
/// Tokenizes with batch-longest padding, runs a forward pass, mean-pools the
/// hidden states under the attention mask, and L2-normalizes the result.
pub struct SentenceEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl SentenceEncoder {
    /// Load an encoder from downloaded artifacts.
    pub fn load(artifacts: &ModelArtifacts, device: Device) -> Result<Self> {
        let config_str = std::fs::read_to_string(&artifacts.config_path)
            .context("Failed to read model config")?;
        let config: BertConfig =
            serde_json::from_str(&config_str).context("Failed to parse BERT config")?;
        let hidden_size = config.hidden_size;

        let mut tokenizer = Tokenizer::from_file(&artifacts.tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        // SAFETY: mmap'd safetensors file — safe as long as the file is not
        // modified while the model is in use.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&artifacts.weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb, &config).context("Failed to construct BERT model")?;

        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size,
        })
    }

    /// Output embedding dimensionality.
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Encode a batch of texts into sentence embeddings, one per input.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let str_refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let encodings = self
            .tokenizer
            .encode_batch(str_refs, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let ids: Vec<u32> = encodings.iter().flat_map(|e| e.get_ids().to_vec()).collect();
        let mask: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().to_vec())
            .collect();
        let type_ids: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_type_ids().to_vec())
            .collect();

        let ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)?;
        let mask = Tensor::from_vec(mask, (batch, seq_len), &self.device)?;
        let type_ids = Tensor::from_vec(type_ids, (batch, seq_len), &self.device)?;

        // Forward pass -> [batch, seq_len, hidden_size]
        let hidden = self.model.forward(&ids, &type_ids, Some(&mask))?;

        // Mean pooling under the attention mask
        let mask_f32 = mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask_f32)?.sum(1)?;
        let counts = mask_f32.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        // L2 normalize so cosine similarity reduces to a dot product
        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norms)?;

        normalized
            .to_vec2::<f32>()
            .context("Failed to convert embeddings to Vec")
    }
}
