use anyhow::Result;

// =============================================================================
// Classifier output
// =============================================================================

/// One scored label from a sequence classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Sort scores highest first. Ties keep model label order.
pub fn rank(mut scores: Vec<LabelScore>) -> Vec<LabelScore> {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores
}

// =============================================================================
// Extraction output
// =============================================================================

/// A token with the flags the keyword filter reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAnnotation {
    pub text: String,
    pub lemma: String,
    pub is_alpha: bool,
    pub is_stop: bool,
    pub is_punct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub text: String,
    pub label: String,
}

/// Single-pass linguistic analysis of a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub tokens: Vec<TokenAnnotation>,
    pub entities: Vec<EntitySpan>,
}

// =============================================================================
// Model traits
// =============================================================================

/// Single-label text classifier (sarcasm, emotion).
///
/// Implementations are shared across worker threads and must tolerate
/// concurrent `classify` calls.
pub trait TextClassifier: Send + Sync {
    /// All labels with scores, highest first.
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;
}

/// Tokenizer + lemmatizer + entity recognizer, run once per text.
pub trait LinguisticAnalyzer: Send + Sync {
    fn annotate(&self, text: &str) -> Result<Annotation>;
}
