//! Candle-based inference backend.
//!
//! Model files are resolved through the HuggingFace Hub (cached under
//! `~/.cache/huggingface/hub/`). Everything here is synchronous and
//! compute-bound; callers run it on the analysis worker pool.

pub mod sequence;
pub mod token;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{LayerNorm, Module, VarBuilder};
use tracing::debug;

pub use sequence::SequenceClassifier;
pub use token::TokenClassifier;

/// Max tokens fed to a BERT-sized encoder.
pub(crate) const MAX_SEQUENCE_TOKENS: usize = 512;

/// Tokens shared by consecutive NER windows over long input.
pub(crate) const WINDOW_STRIDE: usize = 128;

/// Where a model's weights live on disk.
#[derive(Debug, Clone)]
pub enum Weights {
    SafeTensors(PathBuf),
    PyTorch(PathBuf),
}

/// Paths to downloaded model files.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub weights: Weights,
}

/// Resolve a model by repo id, downloading into the local cache if needed.
///
/// Prefers `model.safetensors`; falls back to `pytorch_model.bin` for
/// repos that never published safetensors.
pub fn download_model(repo_id: &str) -> Result<ModelFiles> {
    let api = hf_hub::api::sync::Api::new().context("Failed to initialize HuggingFace Hub API")?;
    let repo = api.model(repo_id.to_string());

    let config_path = repo
        .get("config.json")
        .with_context(|| format!("Failed to download config.json from {repo_id}"))?;
    let tokenizer_path = repo
        .get("tokenizer.json")
        .with_context(|| format!("Failed to download tokenizer.json from {repo_id}"))?;
    let weights = match repo.get("model.safetensors") {
        Ok(path) => Weights::SafeTensors(path),
        Err(e) => {
            debug!(repo = repo_id, error = %e, "No safetensors weights, trying pytorch_model.bin");
            let path = repo
                .get("pytorch_model.bin")
                .with_context(|| format!("No model weights found in {repo_id}"))?;
            Weights::PyTorch(path)
        }
    };

    Ok(ModelFiles {
        config_path,
        tokenizer_path,
        weights,
    })
}

/// Pick the compute device: CUDA when built with the `cuda` feature and a
/// usable GPU is present, CPU otherwise.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            if supports_layer_norm(&device) {
                tracing::info!("Using CUDA GPU for inference");
                return device;
            }
            tracing::warn!("CUDA GPU available but layer-norm not supported, falling back to CPU");
        }
    }
    tracing::info!("Using CPU for inference");
    Device::Cpu
}

/// BERT/RoBERTa need layer-norm; some GPU backends lack the kernel.
#[allow(dead_code)]
fn supports_layer_norm(device: &Device) -> bool {
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

pub(crate) fn load_weights(weights: &Weights, device: &Device) -> Result<VarBuilder<'static>> {
    match weights {
        // SAFETY: mmap'd safetensors file; the hub cache is not modified
        // while the process holds the model.
        Weights::SafeTensors(path) => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)
                .context("Failed to load safetensors weights")
        },
        Weights::PyTorch(path) => VarBuilder::from_pth(path, DType::F32, device)
            .context("Failed to load pytorch weights"),
    }
}

pub(crate) fn read_config(path: &Path) -> Result<(String, serde_json::Value)> {
    let raw = std::fs::read_to_string(path).context("Failed to read config.json")?;
    let json: serde_json::Value =
        serde_json::from_str(&raw).context("Failed to parse config.json")?;
    Ok((raw, json))
}

/// Ordered label names from `id2label`: `{"0": "anger", "1": "disgust", ...}`.
pub(crate) fn parse_id2label(config: &serde_json::Value) -> Result<Vec<String>> {
    let id2label = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .context("config.json missing id2label mapping")?;

    let mut entries: Vec<(usize, String)> = id2label
        .iter()
        .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
        .collect();
    entries.sort_by_key(|(idx, _)| *idx);

    if entries.is_empty() {
        anyhow::bail!("id2label is empty, cannot determine label count");
    }
    Ok(entries.into_iter().map(|(_, label)| label).collect())
}

/// Load a tokenizer that cuts input at [`MAX_SEQUENCE_TOKENS`].
///
/// With a non-zero `stride` the cut-off tail is kept as overlapping
/// overflow windows (`Encoding::get_overflowing`) instead of dropped.
pub(crate) fn load_tokenizer(path: &Path, stride: usize) -> Result<tokenizers::Tokenizer> {
    let tokenizer = tokenizers::Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
    configure_tokenizer(tokenizer, stride)
}

fn configure_tokenizer(
    mut tokenizer: tokenizers::Tokenizer,
    stride: usize,
) -> Result<tokenizers::Tokenizer> {
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_SEQUENCE_TOKENS,
            stride,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}
