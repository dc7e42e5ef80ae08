//! Lazy, construct-once model registry.
//!
//! Each model kind has its own `OnceCell`: concurrent first callers for the
//! same kind block on a single construction, different kinds construct
//! independently, and a failed construction leaves the cell empty so the
//! next caller retries.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use journal_common::ModelKind;
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::error::ModelError;
use crate::traits::{Annotation, LabelScore, LinguisticAnalyzer, TextClassifier};

/// Builds inference-capable handles. Called at most once per kind per
/// successful construction; may be slow (downloads, weight loading).
pub trait ModelLoader: Send + Sync {
    fn load_classifier(&self, kind: ModelKind) -> Result<Arc<dyn TextClassifier>>;
    fn load_analyzer(&self) -> Result<Arc<dyn LinguisticAnalyzer>>;
}

/// A cached handle of any kind.
#[derive(Clone)]
pub enum ModelHandle {
    Classifier(Arc<dyn TextClassifier>),
    Analyzer(Arc<dyn LinguisticAnalyzer>),
}

pub struct ModelRegistry {
    loader: Arc<dyn ModelLoader>,
    serialize_inference: bool,
    sarcasm: OnceCell<Arc<dyn TextClassifier>>,
    emotion: OnceCell<Arc<dyn TextClassifier>>,
    extraction: OnceCell<Arc<dyn LinguisticAnalyzer>>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            serialize_inference: false,
            sarcasm: OnceCell::new(),
            emotion: OnceCell::new(),
            extraction: OnceCell::new(),
        }
    }

    /// Run inference on each model kind under a per-kind lock, for runtimes
    /// that are not safe for concurrent inference.
    pub fn with_serialized_inference(mut self, enabled: bool) -> Self {
        self.serialize_inference = enabled;
        self
    }

    pub fn sarcasm(&self) -> Result<Arc<dyn TextClassifier>, ModelError> {
        self.classifier(ModelKind::Sarcasm, &self.sarcasm)
    }

    pub fn emotion(&self) -> Result<Arc<dyn TextClassifier>, ModelError> {
        self.classifier(ModelKind::Emotion, &self.emotion)
    }

    pub fn extraction(&self) -> Result<Arc<dyn LinguisticAnalyzer>, ModelError> {
        self.extraction
            .get_or_try_init(|| {
                let analyzer = construct(ModelKind::Extraction, || self.loader.load_analyzer())?;
                Ok(if self.serialize_inference {
                    Arc::new(Serialized::new(analyzer)) as Arc<dyn LinguisticAnalyzer>
                } else {
                    analyzer
                })
            })
            .map(Arc::clone)
    }

    pub fn get(&self, kind: ModelKind) -> Result<ModelHandle, ModelError> {
        match kind {
            ModelKind::Sarcasm => self.sarcasm().map(ModelHandle::Classifier),
            ModelKind::Emotion => self.emotion().map(ModelHandle::Classifier),
            ModelKind::Extraction => self.extraction().map(ModelHandle::Analyzer),
        }
    }

    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Sarcasm => self.sarcasm.get().is_some(),
            ModelKind::Emotion => self.emotion.get().is_some(),
            ModelKind::Extraction => self.extraction.get().is_some(),
        }
    }

    /// Construct every kind now. Failures are returned, not cached; the lazy
    /// path will retry them on first use.
    pub fn preload(&self) -> Vec<ModelError> {
        ModelKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).err())
            .collect()
    }

    fn classifier(
        &self,
        kind: ModelKind,
        cell: &OnceCell<Arc<dyn TextClassifier>>,
    ) -> Result<Arc<dyn TextClassifier>, ModelError> {
        cell.get_or_try_init(|| {
            let classifier = construct(kind, || self.loader.load_classifier(kind))?;
            Ok(if self.serialize_inference {
                Arc::new(Serialized::new(classifier)) as Arc<dyn TextClassifier>
            } else {
                classifier
            })
        })
        .map(Arc::clone)
    }
}

fn construct<T>(kind: ModelKind, build: impl FnOnce() -> Result<T>) -> Result<T, ModelError> {
    let started = Instant::now();
    info!(kind = %kind, "Constructing model");
    match build() {
        Ok(model) => {
            info!(
                kind = %kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Model ready"
            );
            Ok(model)
        }
        Err(e) => {
            warn!(kind = %kind, error = %format!("{e:#}"), "Model construction failed");
            Err(ModelError::unavailable(kind, &e))
        }
    }
}

// --- Serialized inference ---

/// Wraps a handle so only one inference runs on it at a time.
struct Serialized<T: ?Sized> {
    inner: Arc<T>,
    lock: Mutex<()>,
}

impl<T: ?Sized> Serialized<T> {
    fn new(inner: Arc<T>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl TextClassifier for Serialized<dyn TextClassifier> {
    fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.inner.classify(text)
    }
}

impl LinguisticAnalyzer for Serialized<dyn LinguisticAnalyzer> {
    fn annotate(&self, text: &str) -> Result<Annotation> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.inner.annotate(text)
    }
}
