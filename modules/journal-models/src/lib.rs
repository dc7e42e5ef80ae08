//! Inference backends for the journal analysis pipeline.
//!
//! Three model kinds sit behind two dyn-compatible traits:
//! sarcasm and emotion are [`TextClassifier`]s, extraction is a
//! [`LinguisticAnalyzer`]. The [`ModelRegistry`] constructs each kind at most
//! once per process through a [`ModelLoader`]; [`HubModelLoader`] is the
//! production loader (HuggingFace Hub + candle).

pub mod backend;
pub mod error;
pub mod linguistic;
pub mod loader;
pub mod registry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use error::ModelError;
pub use loader::{HubModelLoader, ModelSources};
pub use registry::{ModelHandle, ModelLoader, ModelRegistry};
pub use traits::{Annotation, EntitySpan, LabelScore, LinguisticAnalyzer, TextClassifier, TokenAnnotation};
