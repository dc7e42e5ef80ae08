use journal_common::{AnalysisError, ModelKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model unavailable ({kind}): {reason}")]
    Unavailable { kind: ModelKind, reason: String },

    #[error("Inference failed ({kind}): {reason}")]
    Inference { kind: ModelKind, reason: String },
}

impl ModelError {
    pub fn unavailable(kind: ModelKind, err: &anyhow::Error) -> Self {
        ModelError::Unavailable {
            kind,
            reason: format!("{err:#}"),
        }
    }

    pub fn inference(kind: ModelKind, err: &anyhow::Error) -> Self {
        ModelError::Inference {
            kind,
            reason: format!("{err:#}"),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelError::Unavailable { kind, .. } | ModelError::Inference { kind, .. } => *kind,
        }
    }
}

impl From<ModelError> for AnalysisError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Unavailable { kind, reason } => {
                AnalysisError::ModelUnavailable { kind, reason }
            }
            ModelError::Inference { kind, reason } => {
                AnalysisError::ModelInferenceFailed { kind, reason }
            }
        }
    }
}
