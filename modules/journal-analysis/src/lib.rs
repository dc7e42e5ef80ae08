//! Journal entry analysis: sarcasm-gated emotion, keywords and entities,
//! run on a dedicated worker pool.

pub mod emotion;
pub mod executor;
pub mod features;
pub mod orchestrator;

pub use emotion::EmotionResolver;
pub use executor::{AnalysisExecutor, AnalysisTicket};
pub use features::{select_keywords, FeatureExtractor, Features};
pub use orchestrator::{AnalysisPipeline, AnalysisSettings};
