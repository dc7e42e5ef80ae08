use std::collections::HashSet;
use std::sync::Arc;

use journal_common::{Keyword, ModelKind, NamedEntity};
use journal_models::linguistic::is_stop_word;
use journal_models::{ModelError, ModelRegistry, TokenAnnotation};

/// Keywords kept per entry unless configured otherwise.
pub const DEFAULT_KEYWORD_LIMIT: usize = 10;

/// Keywords and entities from one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Features {
    pub keywords: Vec<Keyword>,
    pub entities: Vec<NamedEntity>,
}

pub struct FeatureExtractor {
    registry: Arc<ModelRegistry>,
    keyword_limit: usize,
    include_entities: bool,
}

impl FeatureExtractor {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            include_entities: true,
        }
    }

    pub fn with_keyword_limit(mut self, limit: usize) -> Self {
        self.keyword_limit = limit;
        self
    }

    /// When false, `entities` is always empty.
    pub fn with_entities(mut self, include: bool) -> Self {
        self.include_entities = include;
        self
    }

    /// Run the extraction model once and derive keywords and entities from
    /// its annotation.
    pub fn extract_features(&self, text: &str) -> Result<Features, ModelError> {
        let analyzer = self.registry.extraction()?;
        let annotation = analyzer
            .annotate(text)
            .map_err(|e| ModelError::inference(ModelKind::Extraction, &e))?;

        let keywords = select_keywords(&annotation.tokens, self.keyword_limit);
        let entities = if self.include_entities {
            annotation
                .entities
                .into_iter()
                .map(|span| NamedEntity::new(span.text, span.label))
                .collect()
        } else {
            Vec::new()
        };

        Ok(Features { keywords, entities })
    }
}

/// Alphabetic, non-stop, non-punctuation tokens as lowercase lemmas,
/// deduplicated in first-occurrence order and capped at `limit`.
pub fn select_keywords(tokens: &[TokenAnnotation], limit: usize) -> Vec<Keyword> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|t| t.is_alpha && !t.is_stop && !t.is_punct)
        .map(|t| t.lemma.to_lowercase())
        // a lemma can land on a stopword ("being" -> "be")
        .filter(|lemma| !lemma.is_empty() && !is_stop_word(lemma))
        .filter(|lemma| seen.insert(lemma.clone()))
        .take(limit)
        .map(Keyword::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_models::linguistic::annotate_tokens;

    fn keywords(text: &str, limit: usize) -> Vec<String> {
        select_keywords(&annotate_tokens(text), limit)
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_first_occurrence_order_without_duplicates() {
        assert_eq!(
            keywords("the dog ran and the dog jumped", 10),
            vec!["dog", "run", "jump"]
        );
    }

    #[test]
    fn test_limit_truncates() {
        let text = "apple banana cherry grape lemon mango melon olive peach pear plum";
        let kws = keywords(text, 10);
        assert_eq!(kws.len(), 10);
        assert_eq!(kws[0], "apple");
        assert!(!kws.contains(&"plum".to_string()));
        assert_eq!(keywords(text, 3), vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        assert!(keywords("sunny walk", 0).is_empty());
    }

    #[test]
    fn test_drops_punctuation_numbers_and_stopwords() {
        let kws = keywords("I walked 5 miles!!! And it was, honestly, great.", 10);
        assert_eq!(kws, vec!["walk", "mile", "honestly", "great"]);
    }

    #[test]
    fn test_case_variants_collapse() {
        assert_eq!(keywords("Coffee coffee COFFEE", 10), vec!["coffee"]);
    }

    #[test]
    fn test_flags_are_respected_even_if_lemma_looks_fine() {
        let tokens = vec![
            TokenAnnotation {
                text: "Hello".into(),
                lemma: "hello".into(),
                is_alpha: true,
                is_stop: true,
                is_punct: false,
            },
            TokenAnnotation {
                text: "world".into(),
                lemma: "world".into(),
                is_alpha: true,
                is_stop: false,
                is_punct: false,
            },
        ];
        let kws = select_keywords(&tokens, 10);
        assert_eq!(kws, vec![Keyword::new("world")]);
    }
}
