use std::sync::Arc;

use anyhow::anyhow;
use journal_common::{EmotionLabel, ModelKind};
use journal_models::{LabelScore, ModelError, ModelRegistry, TextClassifier};
use tracing::debug;

/// Sarcasm score above which the emotion model is skipped.
pub const SARCASM_THRESHOLD: f32 = 0.6;

/// Top label the sarcasm detector uses for sarcastic text.
pub const SARCASM_LABEL: &str = "sarcasm";

/// Sarcasm-gated emotion classification.
///
/// Confidently sarcastic text resolves to [`EmotionLabel::Anger`] without
/// consulting the emotion model; everything else takes the emotion model's
/// top label.
pub struct EmotionResolver {
    registry: Arc<ModelRegistry>,
    threshold: f32,
}

impl EmotionResolver {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            threshold: SARCASM_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn resolve_emotion(&self, text: &str) -> Result<EmotionLabel, ModelError> {
        let sarcasm = self.registry.sarcasm()?;
        let top = top_label(sarcasm.as_ref(), ModelKind::Sarcasm, text)?;

        if top.label.eq_ignore_ascii_case(SARCASM_LABEL) && top.score > self.threshold {
            debug!(score = top.score, "Sarcasm detected, overriding emotion");
            return Ok(EmotionLabel::Anger);
        }

        let emotion = self.registry.emotion()?;
        let top = top_label(emotion.as_ref(), ModelKind::Emotion, text)?;
        debug!(label = %top.label, score = top.score, "Emotion classified");

        Ok(EmotionLabel::from_classifier_label(&top.label))
    }
}

fn top_label(
    classifier: &dyn TextClassifier,
    kind: ModelKind,
    text: &str,
) -> Result<LabelScore, ModelError> {
    let scores = classifier
        .classify(text)
        .map_err(|e| ModelError::inference(kind, &e))?;

    match scores.into_iter().next() {
        Some(top) if !top.label.trim().is_empty() => Ok(top),
        Some(_) => Err(ModelError::inference(kind, &anyhow!("classifier returned an empty label"))),
        None => Err(ModelError::inference(kind, &anyhow!("classifier returned no labels"))),
    }
}
