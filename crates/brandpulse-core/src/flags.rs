//! Feature-flag provider backed by a YAML file.
//!
//! ```yaml
//! flags:
//!   runners.mention_analysis.enabled: true
//!   runners.brand_insight.enabled: false
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct FlagsFile {
    #[serde(default)]
    flags: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureFlags {
    values: HashMap<String, Value>,
}

impl FeatureFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a flag, replacing any existing value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Parse flags from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FlagsFileParse`] if the document is not valid YAML
    /// of the expected shape.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: FlagsFile = serde_yaml::from_str(content).map_err(ConfigError::FlagsFileParse)?;
        Ok(Self { values: file.flags })
    }

    /// Raw flag value, or `default` when unset.
    #[must_use]
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    /// Boolean flag lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFlag`] if the flag is set to a non-boolean value.
    pub fn enabled(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ConfigError::InvalidFlag {
                key: key.to_string(),
                reason: format!("expected a boolean, got {other:?}"),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Load feature flags from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_flags(path: &Path) -> Result<FeatureFlags, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FlagsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    FeatureFlags::from_yaml_str(&content)
}

/// Like [`load_flags`], but a missing file yields empty flags.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_flags_or_default(path: &Path) -> Result<FeatureFlags, ConfigError> {
    if !path.exists() {
        return Ok(FeatureFlags::default());
    }
    load_flags(path)
}
