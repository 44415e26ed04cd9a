//! Feature runners and the orchestrator that dispatches them.

pub mod insight;
pub mod mention_analysis;
pub mod orchestrator;
pub mod runner;

use std::sync::Arc;
use std::time::Duration;

use brandpulse_analytics::{Analytics, CompletionProvider};
use brandpulse_core::FeatureFlags;

pub use insight::BrandInsightRunner;
pub use mention_analysis::MentionAnalysisRunner;
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, RunnerStatus, RUNNER_DISABLED, RUNNER_ERROR,
    RUNNER_NOT_FOUND, RUNNER_TIMEOUT,
};
pub use runner::{
    FeatureRunner, FlagGate, RunnerContext, RunnerErrorInfo, RunnerResult, DEADLINE_EXCEEDED,
};

/// Orchestrator with every built-in runner registered.
#[must_use]
pub fn standard_orchestrator(
    analytics: &Analytics,
    provider: Option<Arc<dyn CompletionProvider>>,
    flags: &Arc<FeatureFlags>,
    timeout: Duration,
) -> Orchestrator {
    Orchestrator::builder()
        .timeout(timeout)
        .runner(MentionAnalysisRunner::new(analytics.clone(), Arc::clone(flags)))
        .runner(BrandInsightRunner::new(
            analytics.clone(),
            provider,
            Arc::clone(flags),
        ))
        .build()
}
