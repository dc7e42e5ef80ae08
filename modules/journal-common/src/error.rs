use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::ModelKind;

/// Pipeline stage an analysis failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Emotion,
    Features,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Emotion => f.write_str("emotion"),
            Stage::Features => f.write_str("features"),
        }
    }
}

/// Coarse failure category; the only detail the transport exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    ModelUnavailable,
    ModelInferenceFailed,
    ExecutorUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::ModelInferenceFailed => "model_inference_failed",
            ErrorKind::ExecutorUnavailable => "executor_unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model unavailable ({kind}): {reason}")]
    ModelUnavailable { kind: ModelKind, reason: String },

    #[error("Model inference failed ({kind}): {reason}")]
    ModelInferenceFailed { kind: ModelKind, reason: String },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<AnalysisError>,
    },

    #[error("Analysis executor is shut down")]
    ExecutorClosed,

    #[error("Analysis worker failed: {0}")]
    WorkerFailed(String),
}

impl AnalysisError {
    /// Attribute this error to a pipeline stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        AnalysisError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            AnalysisError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            AnalysisError::ModelInferenceFailed { .. } => ErrorKind::ModelInferenceFailed,
            AnalysisError::Stage { source, .. } => source.kind(),
            AnalysisError::ExecutorClosed => ErrorKind::ExecutorUnavailable,
            AnalysisError::WorkerFailed(_) => ErrorKind::Internal,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalysisError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
