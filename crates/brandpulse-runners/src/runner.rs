//! The runner contract: a named, flag-gated unit of analysis run against a
//! shared [`RunnerContext`] that always answers with a [`RunnerResult`].

use std::sync::Arc;

use async_trait::async_trait;
use brandpulse_analytics::{AnalyticsError, CompetitorMention};
use brandpulse_core::FeatureFlags;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Instant;
use uuid::Uuid;

pub const DEADLINE_EXCEEDED: &str = "DEADLINE_EXCEEDED";

#[async_trait]
pub trait FeatureRunner: Send + Sync {
    /// Unique registry name, e.g. `mention-analysis`.
    fn name(&self) -> &str;

    async fn is_enabled(&self) -> anyhow::Result<bool>;

    /// Domain failures come back as `Ok` with an error envelope carrying the
    /// runner's own code. `Err` is reserved for unexpected failures.
    async fn run(&self, ctx: &RunnerContext) -> anyhow::Result<RunnerResult>;
}

/// Request-scoped input shared by every runner in one dispatch.
#[derive(Debug, Clone)]
pub struct RunnerContext {
    pub request_id: Uuid,
    pub brand_id: Option<String>,
    pub brand_name: Option<String>,
    pub content: Option<String>,
    /// Citation sources to track against the analyzed mention.
    pub citations: Vec<String>,
    pub competitors: Vec<CompetitorMention>,
    pub total_responses: Option<usize>,
    pub metadata: Value,
    pub deadline: Option<Instant>,
}

impl Default for RunnerContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            brand_id: None,
            brand_name: None,
            content: None,
            citations: Vec::new(),
            competitors: Vec::new(),
            total_responses: None,
            metadata: Value::Object(serde_json::Map::new()),
            deadline: None,
        }
    }
}

impl RunnerContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_brand(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.brand_id = Some(id.into());
        self.brand_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_citations(mut self, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.citations = sources.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_competitors(
        mut self,
        competitors: Vec<CompetitorMention>,
        total_responses: Option<usize>,
    ) -> Self {
        self.competitors = competitors;
        self.total_responses = total_responses;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Tighten the deadline to `deadline`, keeping an earlier one if already set.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    #[must_use]
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Some(failure)` once the deadline has passed; checked between steps.
    #[must_use]
    pub fn check_deadline(&self, step: &str) -> Option<RunnerResult> {
        self.deadline_exceeded().then(|| {
            RunnerResult::failure(
                DEADLINE_EXCEEDED,
                format!("deadline exceeded before {step}"),
            )
            .with_details(json!({ "step": step }))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerErrorInfo {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

/// Uniform runner outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunnerErrorInfo>,
}

impl RunnerResult {
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(RunnerErrorInfo {
                message: message.into(),
                code: code.into(),
                details: Value::Null,
            }),
        }
    }

    /// Attach details to a failure. No-op on success.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = details;
        }
        self
    }

    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

impl From<&AnalyticsError> for RunnerResult {
    fn from(err: &AnalyticsError) -> Self {
        Self::failure(err.code(), err.to_string())
    }
}

/// Boolean feature-flag lookup used by runners' `is_enabled`.
#[derive(Debug, Clone)]
pub struct FlagGate {
    flags: Arc<FeatureFlags>,
    key: &'static str,
    default: bool,
}

impl FlagGate {
    #[must_use]
    pub fn new(flags: Arc<FeatureFlags>, key: &'static str, default: bool) -> Self {
        Self {
            flags,
            key,
            default,
        }
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// # Errors
    ///
    /// Fails when the flag is set to a non-boolean value.
    pub fn check(&self) -> anyhow::Result<bool> {
        Ok(self.flags.enabled(self.key, self.default)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn failure_serializes_error_envelope() {
        let result = RunnerResult::failure("MISSING_CONTENT", "content is required")
            .with_details(json!({"field": "content"}));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "MISSING_CONTENT");
        assert_eq!(json["error"]["details"]["field"], "content");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn ok_has_no_error() {
        let result = RunnerResult::ok(json!({"n": 1}));
        assert!(result.success);
        assert_eq!(result.error_code(), None);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn analytics_error_keeps_its_code() {
        let err = AnalyticsError::validation("MISSING_SOURCE", "source required");
        let result = RunnerResult::from(&err);
        assert_eq!(result.error_code(), Some("MISSING_SOURCE"));
    }

    #[test]
    fn flag_gate_uses_default_and_rejects_non_bool() {
        let flags = Arc::new(FeatureFlags::new().with("a.enabled", false).with("b.enabled", "yes"));
        assert!(!FlagGate::new(Arc::clone(&flags), "a.enabled", true).check().unwrap());
        assert!(FlagGate::new(Arc::clone(&flags), "missing", true).check().unwrap());
        assert!(FlagGate::new(flags, "b.enabled", true).check().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_keeps_the_earlier_instant() {
        let now = Instant::now();
        let ctx = RunnerContext::new()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(30));
        assert_eq!(ctx.deadline, Some(now + Duration::from_secs(5)));
        assert!(ctx.check_deadline("scan").is_none());

        tokio::time::advance(Duration::from_secs(6)).await;
        let failure = ctx.check_deadline("scan").unwrap();
        assert_eq!(failure.error_code(), Some(DEADLINE_EXCEEDED));
    }
}
