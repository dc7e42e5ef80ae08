// Test doubles for the model boundary.
//
// - FixedClassifier (TextClassifier): returns a fixed scored label list
// - FailingClassifier (TextClassifier): always errors
// - GatedClassifier (TextClassifier): blocks until released, for timeout and cancellation tests
// - ScriptedAnalyzer (LinguisticAnalyzer): real rule-based tokens, scripted entities
// - CountingLoader (ModelLoader): counts constructions, can fail the first N

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use journal_common::ModelKind;

use crate::linguistic::annotate_tokens;
use crate::registry::ModelLoader;
use crate::traits::{rank, Annotation, EntitySpan, LabelScore, LinguisticAnalyzer, TextClassifier};

// ---------------------------------------------------------------------------
// FixedClassifier
// ---------------------------------------------------------------------------

/// Returns the same scores for every input and counts calls.
pub struct FixedClassifier {
    scores: Vec<LabelScore>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(scores: &[(&str, f32)]) -> Self {
        Self {
            scores: rank(
                scores
                    .iter()
                    .map(|(label, score)| LabelScore::new(*label, *score))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    /// Single label with full confidence.
    pub fn single(label: &str) -> Self {
        Self::new(&[(label, 1.0)])
    }

    /// Sarcasm detector output with `score` on the sarcasm label.
    pub fn sarcasm(score: f32) -> Self {
        Self::new(&[("sarcasm", score), ("not_sarcasm", 1.0 - score)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextClassifier for FixedClassifier {
    fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

// ---------------------------------------------------------------------------
// FailingClassifier
// ---------------------------------------------------------------------------

pub struct FailingClassifier {
    message: String,
}

impl FailingClassifier {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl TextClassifier for FailingClassifier {
    fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        bail!("{}", self.message)
    }
}

// ---------------------------------------------------------------------------
// GatedClassifier
// ---------------------------------------------------------------------------

/// Blocks every `classify` call until [`GatedClassifier::open`] is called,
/// then delegates to a fixed output.
pub struct GatedClassifier {
    inner: FixedClassifier,
    open: Mutex<bool>,
    opened: Condvar,
    entered: AtomicUsize,
}

impl GatedClassifier {
    pub fn new(inner: FixedClassifier) -> Self {
        Self {
            inner,
            open: Mutex::new(false),
            opened: Condvar::new(),
            entered: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        let mut open = self.open.lock().unwrap();
        *open = true;
        self.opened.notify_all();
    }

    /// Calls that have reached the gate, blocked or not.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Calls that made it through the gate.
    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

impl TextClassifier for GatedClassifier {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
        drop(open);
        self.inner.classify(text)
    }
}

// ---------------------------------------------------------------------------
// ScriptedAnalyzer
// ---------------------------------------------------------------------------

/// Rule-based tokens from the real tokenizer plus a fixed entity list.
pub struct ScriptedAnalyzer {
    entities: Vec<EntitySpan>,
    calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entity(mut self, text: &str, label: &str) -> Self {
        self.entities.push(EntitySpan {
            text: text.to_string(),
            label: label.to_string(),
        });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LinguisticAnalyzer for ScriptedAnalyzer {
    fn annotate(&self, text: &str) -> Result<Annotation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Annotation {
            tokens: annotate_tokens(text),
            entities: self.entities.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// CountingLoader
// ---------------------------------------------------------------------------

/// Hands out pre-built handles, counting how often each kind is constructed.
/// Builder pattern: `.sarcasm()`, `.emotion()`, `.analyzer()`, `.fail_first()`.
pub struct CountingLoader {
    sarcasm: Arc<dyn TextClassifier>,
    emotion: Arc<dyn TextClassifier>,
    analyzer: Arc<dyn LinguisticAnalyzer>,
    failures_left: Mutex<HashMap<ModelKind, usize>>,
    loads: Mutex<HashMap<ModelKind, usize>>,
    delay: Option<Duration>,
}

impl CountingLoader {
    /// Not sarcastic, "joy", no entities.
    pub fn new() -> Self {
        Self {
            sarcasm: Arc::new(FixedClassifier::sarcasm(0.1)),
            emotion: Arc::new(FixedClassifier::single("joy")),
            analyzer: Arc::new(ScriptedAnalyzer::new()),
            failures_left: Mutex::new(HashMap::new()),
            loads: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    pub fn sarcasm(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.sarcasm = classifier;
        self
    }

    pub fn emotion(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.emotion = classifier;
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn LinguisticAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// The first `n` constructions of `kind` fail.
    pub fn fail_first(self, kind: ModelKind, n: usize) -> Self {
        self.failures_left.lock().unwrap().insert(kind, n);
        self
    }

    /// Sleep inside every construction, to widen race windows.
    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Construction attempts for `kind`, failed ones included.
    pub fn loads(&self, kind: ModelKind) -> usize {
        self.loads.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    fn attempt(&self, kind: ModelKind) -> Result<()> {
        *self.loads.lock().unwrap().entry(kind).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let mut failures = self.failures_left.lock().unwrap();
        if let Some(left) = failures.get_mut(&kind) {
            if *left > 0 {
                *left -= 1;
                bail!("simulated {kind} load failure");
            }
        }
        Ok(())
    }
}

impl Default for CountingLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelLoader for CountingLoader {
    fn load_classifier(&self, kind: ModelKind) -> Result<Arc<dyn TextClassifier>> {
        self.attempt(kind)?;
        match kind {
            ModelKind::Sarcasm => Ok(self.sarcasm.clone()),
            ModelKind::Emotion => Ok(self.emotion.clone()),
            ModelKind::Extraction => bail!("{kind} is not a text classifier"),
        }
    }

    fn load_analyzer(&self) -> Result<Arc<dyn LinguisticAnalyzer>> {
        self.attempt(ModelKind::Extraction)?;
        Ok(self.analyzer.clone())
    }
}
