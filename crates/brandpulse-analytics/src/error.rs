use brandpulse_core::StoreError;
use thiserror::Error;

use crate::llm::CompletionError;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Required input is missing or out of range. `code` is stable for callers.
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("analysis failed ({context}): {source}")]
    Analysis {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(#[source] StoreError),

    #[error("completion provider error: {0}")]
    Completion(#[from] CompletionError),
}

impl AnalyticsError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn analysis(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Analysis {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => code,
            Self::Analysis { .. } => "ANALYSIS_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Completion(_) => "COMPLETION_ERROR",
        }
    }
}

impl From<StoreError> for AnalyticsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MentionNotFound(id) => Self::NotFound(format!("mention {id}")),
            other @ StoreError::Backend(_) => Self::Persistence(other),
        }
    }
}
