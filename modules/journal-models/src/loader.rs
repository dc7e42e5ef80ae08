use std::sync::Arc;

use anyhow::{Context, Result};
use candle_core::Device;
use journal_common::{Config, ModelKind};
use tracing::info;

use crate::backend::{download_model, select_device, SequenceClassifier, TokenClassifier};
use crate::linguistic::EnglishPipeline;
use crate::registry::ModelLoader;
use crate::traits::{LinguisticAnalyzer, TextClassifier};

/// Which hub repos back each model kind.
#[derive(Debug, Clone)]
pub struct ModelSources {
    pub sarcasm: String,
    pub emotion: String,
    pub ner: String,
    pub enable_entities: bool,
}

impl From<&Config> for ModelSources {
    fn from(config: &Config) -> Self {
        Self {
            sarcasm: config.sarcasm_model.clone(),
            emotion: config.emotion_model.clone(),
            ner: config.ner_model.clone(),
            enable_entities: config.enable_entities,
        }
    }
}

/// Production loader: downloads from the HuggingFace Hub and builds candle
/// models on the selected device.
pub struct HubModelLoader {
    sources: ModelSources,
    device: Device,
}

impl HubModelLoader {
    pub fn new(sources: ModelSources) -> Self {
        Self {
            sources,
            device: select_device(),
        }
    }

    pub fn sources(&self) -> &ModelSources {
        &self.sources
    }
}

impl ModelLoader for HubModelLoader {
    fn load_classifier(&self, kind: ModelKind) -> Result<Arc<dyn TextClassifier>> {
        let repo = match kind {
            ModelKind::Sarcasm => &self.sources.sarcasm,
            ModelKind::Emotion => &self.sources.emotion,
            ModelKind::Extraction => anyhow::bail!("{kind} is not a text classifier"),
        };
        info!(kind = %kind, repo = %repo, "Loading classifier from hub");

        let files = download_model(repo)?;
        let classifier = SequenceClassifier::new(&files, self.device.clone())
            .with_context(|| format!("Failed to build {kind} classifier from {repo}"))?;
        Ok(Arc::new(classifier))
    }

    fn load_analyzer(&self) -> Result<Arc<dyn LinguisticAnalyzer>> {
        if !self.sources.enable_entities {
            info!("Entity recognition disabled, using token-only pipeline");
            return Ok(Arc::new(EnglishPipeline::without_entities()));
        }

        let repo = &self.sources.ner;
        info!(repo = %repo, "Loading NER model from hub");
        let files = download_model(repo)?;
        let ner = TokenClassifier::new(&files, self.device.clone())
            .with_context(|| format!("Failed to build NER model from {repo}"))?;
        Ok(Arc::new(EnglishPipeline::new(ner)))
    }
}
