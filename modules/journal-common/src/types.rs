use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AnalysisError;

// --- Model kinds ---

/// The three inference roles tracked independently by the model registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Sarcasm,
    Emotion,
    Extraction,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Sarcasm, ModelKind::Emotion, ModelKind::Extraction];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Sarcasm => "sarcasm",
            ModelKind::Emotion => "emotion",
            ModelKind::Extraction => "extraction",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Request ---

/// Raw journal text submitted for analysis. Never empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    text: String,
}

impl AnalysisRequest {
    /// Rejects empty and whitespace-only text before any model sees it.
    pub fn new(text: impl Into<String>) -> Result<Self, AnalysisError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "text must not be empty".to_string(),
            ));
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// --- Emotion ---

/// Dominant emotion of a journal entry.
///
/// Classifier labels outside the fixed set are carried in `Other`,
/// capitalized, instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EmotionLabel {
    Joy,
    Sadness,
    Anger,
    Love,
    Neutral,
    Fear,
    Surprise,
    Disgust,
    Other(String),
}

impl EmotionLabel {
    /// Map a raw classifier label onto the fixed set (case-insensitive).
    pub fn from_classifier_label(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_lowercase().as_str() {
            "joy" => EmotionLabel::Joy,
            "sadness" => EmotionLabel::Sadness,
            "anger" => EmotionLabel::Anger,
            "love" => EmotionLabel::Love,
            "neutral" => EmotionLabel::Neutral,
            "fear" => EmotionLabel::Fear,
            "surprise" => EmotionLabel::Surprise,
            "disgust" => EmotionLabel::Disgust,
            _ => EmotionLabel::Other(capitalize(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EmotionLabel::Joy => "Joy",
            EmotionLabel::Sadness => "Sadness",
            EmotionLabel::Anger => "Anger",
            EmotionLabel::Love => "Love",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Surprise => "Surprise",
            EmotionLabel::Disgust => "Disgust",
            EmotionLabel::Other(label) => label,
        }
    }

    /// True for the eight labels of the fixed set.
    pub fn is_known(&self) -> bool {
        !matches!(self, EmotionLabel::Other(_))
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EmotionLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EmotionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EmotionLabel::from_classifier_label(&raw))
    }
}

/// Uppercase the first character, lowercase the rest.
pub fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

// --- Features ---

/// Lowercase lemma of an alphabetic, non-stopword token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    pub fn new(lemma: impl Into<String>) -> Self {
        Self(lemma.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Keyword {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Entity span as reported by the extraction model, unnormalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub text: String,
    pub label: String,
}

impl NamedEntity {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

// --- Result ---

/// Complete analysis of one journal entry. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    emotion: EmotionLabel,
    keywords: Vec<Keyword>,
    entities: Vec<NamedEntity>,
}

impl AnalysisResult {
    pub fn new(emotion: EmotionLabel, keywords: Vec<Keyword>, entities: Vec<NamedEntity>) -> Self {
        Self {
            emotion,
            keywords,
            entities,
        }
    }

    pub fn emotion(&self) -> &EmotionLabel {
        &self.emotion
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn entities(&self) -> &[NamedEntity] {
        &self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_empty_text() {
        let err = AnalysisRequest::new("").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_rejects_whitespace_only() {
        assert!(AnalysisRequest::new("  \n\t ").is_err());
    }

    #[test]
    fn test_request_keeps_text_verbatim() {
        let req = AnalysisRequest::new("  Rainy day. ").unwrap();
        assert_eq!(req.text(), "  Rainy day. ");
    }

    #[test]
    fn test_known_labels_map_case_insensitively() {
        assert_eq!(EmotionLabel::from_classifier_label("joy"), EmotionLabel::Joy);
        assert_eq!(EmotionLabel::from_classifier_label("SADNESS"), EmotionLabel::Sadness);
        assert_eq!(EmotionLabel::from_classifier_label("Disgust"), EmotionLabel::Disgust);
        assert_eq!(EmotionLabel::from_classifier_label(" fear "), EmotionLabel::Fear);
    }

    #[test]
    fn test_unknown_label_is_capitalized_pass_through() {
        let label = EmotionLabel::from_classifier_label("OPTIMISM");
        assert_eq!(label, EmotionLabel::Other("Optimism".to_string()));
        assert!(!label.is_known());
        assert_eq!(label.as_str(), "Optimism");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("remorse"), "Remorse");
        assert_eq!(capitalize("gRaTiTuDe"), "Gratitude");
        assert_eq!(capitalize("é"), "É");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_result_serializes_to_wire_shape() {
        let result = AnalysisResult::new(
            EmotionLabel::Joy,
            vec![Keyword::new("happy"), Keyword::new("today")],
            vec![NamedEntity::new("Paris", "LOC")],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "emotion": "Joy",
                "keywords": ["happy", "today"],
                "entities": [{"text": "Paris", "label": "LOC"}],
            })
        );
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Sarcasm.to_string(), "sarcasm");
        assert_eq!(ModelKind::Extraction.as_str(), "extraction");
    }
}
