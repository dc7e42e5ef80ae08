//! English linguistic pipeline: rule-based tokenization, stopword flags and
//! lemmas, plus optional transformer NER.

mod lemma;
mod stopwords;
mod tokenize;

use anyhow::Result;

pub use lemma::lemmatize;
pub use stopwords::is_stop_word;
pub use tokenize::annotate_tokens;

use crate::backend::TokenClassifier;
use crate::traits::{Annotation, LinguisticAnalyzer};

pub struct EnglishPipeline {
    ner: Option<TokenClassifier>,
}

impl EnglishPipeline {
    pub fn new(ner: TokenClassifier) -> Self {
        Self { ner: Some(ner) }
    }

    /// Tokens only; `entities` is always empty.
    pub fn without_entities() -> Self {
        Self { ner: None }
    }

    pub fn has_entities(&self) -> bool {
        self.ner.is_some()
    }
}

impl LinguisticAnalyzer for EnglishPipeline {
    fn annotate(&self, text: &str) -> Result<Annotation> {
        let tokens = annotate_tokens(text);
        let entities = match &self.ner {
            Some(ner) => ner.recognize(text)?,
            None => Vec::new(),
        };
        Ok(Annotation { tokens, entities })
    }
}
