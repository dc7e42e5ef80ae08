use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XLMRobertaConfig, XLMRobertaForSequenceClassification,
};
use tokenizers::Tokenizer;
use tracing::info;

use super::{load_tokenizer, load_weights, parse_id2label, read_config, ModelFiles};
use crate::traits::{rank, LabelScore, TextClassifier};

enum Architecture {
    /// `BertForSequenceClassification`: encoder, tanh pooler over [CLS], linear head.
    Bert {
        model: BertModel,
        pooler: Linear,
        classifier: Linear,
    },
    /// RoBERTa / DistilRoBERTa / XLM-R: the head is part of the candle model.
    Roberta(XLMRobertaForSequenceClassification),
}

/// Single-label sequence classifier (softmax over `id2label`).
///
/// Covers the two encoder families used by the journal models: BERT
/// (sarcasm detector) and RoBERTa (emotion classifier), selected by
/// `model_type` in config.json.
pub struct SequenceClassifier {
    arch: Architecture,
    tokenizer: Tokenizer,
    device: Device,
    labels: Vec<String>,
}

impl SequenceClassifier {
    pub fn new(files: &ModelFiles, device: Device) -> Result<Self> {
        let (raw_config, config_json) = read_config(&files.config_path)?;
        let labels = parse_id2label(&config_json)?;
        let model_type = config_json
            .get("model_type")
            .and_then(|v| v.as_str())
            .unwrap_or("bert")
            .to_string();

        let tokenizer = load_tokenizer(&files.tokenizer_path, 0)?;
        let vb = load_weights(&files.weights, &device)?;

        let arch = match model_type.as_str() {
            "bert" => {
                let config: BertConfig =
                    serde_json::from_str(&raw_config).context("Failed to parse BERT config")?;
                let classifier =
                    candle_nn::linear(config.hidden_size, labels.len(), vb.pp("classifier"))
                        .context("Failed to load classifier head")?;
                let pooler = candle_nn::linear(
                    config.hidden_size,
                    config.hidden_size,
                    vb.pp("bert").pp("pooler").pp("dense"),
                )
                .context("Failed to load pooler")?;
                let model = BertModel::load(vb.pp("bert"), &config)
                    .context("Failed to construct BERT model")?;
                Architecture::Bert {
                    model,
                    pooler,
                    classifier,
                }
            }
            "roberta" | "xlm-roberta" => {
                let config: XLMRobertaConfig = serde_json::from_str(&raw_config)
                    .context("Failed to parse RoBERTa config")?;
                let model = XLMRobertaForSequenceClassification::new(labels.len(), &config, vb)
                    .context("Failed to construct RoBERTa classifier")?;
                Architecture::Roberta(model)
            }
            other => anyhow::bail!("Unsupported model_type for sequence classification: {other}"),
        };

        info!(
            model_type = %model_type,
            labels = labels.len(),
            "Sequence classifier loaded"
        );

        Ok(Self {
            arch,
            tokenizer,
            device,
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn logits(&self, text: &str) -> Result<Tensor> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Classifier tokenization failed: {}", e))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let logits = match &self.arch {
            Architecture::Bert {
                model,
                pooler,
                classifier,
            } => {
                // [1, seq, hidden] -> [CLS] -> [1, hidden]
                let hidden = model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
                let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
                let pooled = pooler.forward(&cls)?.tanh()?;
                classifier.forward(&pooled)?
            }
            Architecture::Roberta(model) => {
                // RoBERTa ignores token types
                let token_type_ids = input_ids.zeros_like()?;
                model.forward(&input_ids, &attention_mask, &token_type_ids)?
            }
        };
        Ok(logits)
    }
}

impl TextClassifier for SequenceClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let logits = self.logits(text)?;
        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let row = probs
            .to_vec2::<f32>()?
            .into_iter()
            .next()
            .context("Classifier returned no rows")?;

        let scores = self
            .labels
            .iter()
            .zip(row)
            .map(|(label, score)| LabelScore::new(label.clone(), score))
            .collect();
        Ok(rank(scores))
    }
}
