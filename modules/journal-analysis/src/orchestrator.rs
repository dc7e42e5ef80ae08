use std::sync::Arc;
use std::time::Instant;

use journal_common::{AnalysisError, AnalysisRequest, AnalysisResult, Config, Stage};
use journal_models::ModelRegistry;
use tracing::{info, warn};

use crate::emotion::{EmotionResolver, SARCASM_THRESHOLD};
use crate::features::{FeatureExtractor, DEFAULT_KEYWORD_LIMIT};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub sarcasm_threshold: f32,
    pub keyword_limit: usize,
    pub include_entities: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sarcasm_threshold: SARCASM_THRESHOLD,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            include_entities: true,
        }
    }
}

impl From<&Config> for AnalysisSettings {
    fn from(config: &Config) -> Self {
        Self {
            sarcasm_threshold: config.sarcasm_threshold,
            keyword_limit: config.keyword_limit,
            include_entities: config.enable_entities,
        }
    }
}

/// Emotion stage followed by the feature stage, all-or-nothing.
pub struct AnalysisPipeline {
    emotion: EmotionResolver,
    features: FeatureExtractor,
}

impl AnalysisPipeline {
    pub fn new(registry: Arc<ModelRegistry>, settings: AnalysisSettings) -> Self {
        Self {
            emotion: EmotionResolver::new(registry.clone())
                .with_threshold(settings.sarcasm_threshold),
            features: FeatureExtractor::new(registry)
                .with_keyword_limit(settings.keyword_limit)
                .with_entities(settings.include_entities),
        }
    }

    /// Run both stages synchronously. Blocks on model inference; call from a
    /// worker thread, not the async runtime.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let text = request.text();

        let emotion = self
            .emotion
            .resolve_emotion(text)
            .map_err(|e| AnalysisError::from(e).in_stage(Stage::Emotion))
            .inspect_err(|e| warn!(error = %e, chars = text.chars().count(), "Analysis failed"))?;

        let features = self
            .features
            .extract_features(text)
            .map_err(|e| AnalysisError::from(e).in_stage(Stage::Features))
            .inspect_err(|e| warn!(error = %e, chars = text.chars().count(), "Analysis failed"))?;

        info!(
            chars = text.chars().count(),
            emotion = %emotion,
            keywords = features.keywords.len(),
            entities = features.entities.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisResult::new(emotion, features.keywords, features.entities))
    }
}
