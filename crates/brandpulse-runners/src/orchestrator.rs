//! Runner registry and dispatch.
//!
//! Each invocation runs on its own spawned task under the context deadline, so
//! a runner that errors, panics or hangs yields a structured failure for that
//! runner alone.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use tokio::time::Instant;

use crate::runner::{FeatureRunner, RunnerContext, RunnerResult};

pub const RUNNER_NOT_FOUND: &str = "RUNNER_NOT_FOUND";
pub const RUNNER_DISABLED: &str = "RUNNER_DISABLED";
pub const RUNNER_ERROR: &str = "RUNNER_ERROR";
pub const RUNNER_TIMEOUT: &str = "RUNNER_TIMEOUT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Enablement of one registered runner; `Err` holds the failed check's message.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerStatus {
    pub name: String,
    pub enabled: Result<bool, String>,
}

pub struct OrchestratorBuilder {
    runners: Vec<Arc<dyn FeatureRunner>>,
    timeout: Duration,
    max_concurrency: usize,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            runners: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn runner(mut self, runner: impl FeatureRunner + 'static) -> Self {
        self.runners.push(Arc::new(runner));
        self
    }

    #[must_use]
    pub fn shared_runner(mut self, runner: Arc<dyn FeatureRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    #[must_use]
    pub fn build(self) -> Orchestrator {
        let mut orchestrator = Orchestrator {
            runners: HashMap::with_capacity(self.runners.len()),
            timeout: self.timeout,
            max_concurrency: self.max_concurrency,
        };
        for runner in self.runners {
            orchestrator.register(runner);
        }
        orchestrator
    }
}

pub struct Orchestrator {
    runners: HashMap<String, Arc<dyn FeatureRunner>>,
    timeout: Duration,
    max_concurrency: usize,
}

impl Orchestrator {
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Register `runner` under its name. An existing runner with the same name
    /// is replaced and returned.
    pub fn register(&mut self, runner: Arc<dyn FeatureRunner>) -> Option<Arc<dyn FeatureRunner>> {
        let name = runner.name().to_string();
        let previous = self.runners.insert(name.clone(), runner);
        if previous.is_some() {
            tracing::warn!(runner = %name, "runner re-registered; previous registration replaced");
        } else {
            tracing::debug!(runner = %name, "runner registered");
        }
        previous
    }

    /// Registered names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate every runner's enablement check.
    pub async fn statuses(&self) -> Vec<RunnerStatus> {
        let mut statuses: Vec<RunnerStatus> = stream::iter(self.runners.values())
            .map(|runner| async move {
                RunnerStatus {
                    name: runner.name().to_string(),
                    enabled: runner.is_enabled().await.map_err(|e| format!("{e:#}")),
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    fn scoped(&self, ctx: &RunnerContext) -> Arc<RunnerContext> {
        Arc::new(ctx.clone().with_deadline(Instant::now() + self.timeout))
    }

    /// Run every enabled runner concurrently. Disabled runners and runners whose
    /// enablement check fails are left out of the map.
    pub async fn run_all(&self, ctx: &RunnerContext) -> BTreeMap<String, RunnerResult> {
        let ctx = self.scoped(ctx);

        let enabled: Vec<Arc<dyn FeatureRunner>> = stream::iter(self.runners.values())
            .map(|runner| async move {
                match runner.is_enabled().await {
                    Ok(true) => Some(Arc::clone(runner)),
                    Ok(false) => {
                        tracing::debug!(runner = runner.name(), "runner disabled; skipped");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(
                            runner = runner.name(),
                            error = %format!("{e:#}"),
                            "enablement check failed; runner excluded"
                        );
                        None
                    }
                }
            })
            .buffer_unordered(self.max_concurrency)
            .filter_map(|runner| async move { runner })
            .collect()
            .await;

        tracing::debug!(
            request_id = %ctx.request_id,
            registered = self.runners.len(),
            enabled = enabled.len(),
            "dispatching runners"
        );

        stream::iter(enabled)
            .map(|runner| {
                let ctx = Arc::clone(&ctx);
                async move {
                    let name = runner.name().to_string();
                    let result = invoke(runner, ctx).await;
                    (name, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }

    /// Run one runner by name.
    pub async fn run_one(&self, name: &str, ctx: &RunnerContext) -> RunnerResult {
        let Some(runner) = self.runners.get(name) else {
            return RunnerResult::failure(RUNNER_NOT_FOUND, format!("runner '{name}' is not registered"))
                .with_details(json!({ "runner": name }));
        };

        match runner.is_enabled().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(runner = name, "runner disabled; skipped");
                return RunnerResult::failure(RUNNER_DISABLED, format!("runner '{name}' is disabled"))
                    .with_details(json!({ "runner": name }));
            }
            Err(e) => {
                let message = format!("{e:#}");
                log_failure(name, RUNNER_ERROR, &message);
                return RunnerResult::failure(RUNNER_ERROR, message).with_details(json!({
                    "runner": name,
                    "phase": "enablement",
                    "timestamp": Utc::now().to_rfc3339(),
                }));
            }
        }

        invoke(Arc::clone(runner), self.scoped(ctx)).await
    }
}

fn log_failure(runner: &str, code: &str, message: &str) {
    tracing::warn!(
        runner,
        code,
        category = "analysis_failure",
        error = message,
        "runner failed"
    );
}

fn runner_error(runner: &str, code: &str, message: String) -> RunnerResult {
    log_failure(runner, code, &message);
    RunnerResult::failure(code, message).with_details(json!({
        "runner": runner,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

async fn invoke(runner: Arc<dyn FeatureRunner>, ctx: Arc<RunnerContext>) -> RunnerResult {
    let name = runner.name().to_string();
    let deadline = ctx.deadline;

    let task = tokio::spawn({
        let runner = Arc::clone(&runner);
        let ctx = Arc::clone(&ctx);
        async move { runner.run(&ctx).await }
    });
    let abort = task.abort_handle();

    let joined = match deadline {
        Some(at) => match tokio::time::timeout_at(at, task).await {
            Ok(joined) => joined,
            Err(_) => {
                abort.abort();
                return runner_error(&name, RUNNER_TIMEOUT, format!("runner '{name}' timed out"));
            }
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(result)) => {
            if let Some(error) = &result.error {
                log_failure(&name, &error.code, &error.message);
            }
            result
        }
        Ok(Err(e)) => runner_error(&name, RUNNER_ERROR, format!("{e:#}")),
        Err(join_err) if join_err.is_panic() => {
            let message = panic_message(join_err.into_panic().as_ref());
            runner_error(&name, RUNNER_ERROR, format!("runner panicked: {message}"))
        }
        Err(join_err) => runner_error(&name, RUNNER_ERROR, join_err.to_string()),
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
