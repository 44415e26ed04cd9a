//! Shared domain records, configuration, and the persistence port for brandpulse.

pub mod app_config;
pub mod config;
pub mod flags;
pub mod models;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, CitationScope, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use flags::{load_flags, load_flags_or_default, FeatureFlags};
pub use models::{
    Citation, CitationFilter, CitationOrder, Mention, MentionQuery, MentionWithCitations,
    NewCitation, NewMention, TimeWindow, TrendPoint,
};
pub use store::{MentionStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read flags file {path}: {source}")]
    FlagsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse flags file: {0}")]
    FlagsFileParse(#[source] serde_yaml::Error),

    #[error("flag '{key}' is invalid: {reason}")]
    InvalidFlag { key: String, reason: String },

    #[error("validation error: {0}")]
    Validation(String),
}
