//! Sub-command handlers. Every handler prints pretty JSON on stdout.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use brandpulse_analytics::{
    aggregate, normalize_domain, rank, relative_position, CompetitorMention,
};
use brandpulse_core::TimeWindow;
use brandpulse_runners::{mention_analysis, RunnerContext, RunnerResult};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use serde_json::json;

use crate::wiring::Services;

/// Inputs shared by `analyze` and `run-all`.
#[derive(Debug, Args)]
pub(crate) struct AnalysisArgs {
    /// Brand name to detect in the text
    #[arg(long)]
    pub(crate) brand: String,

    /// Brand id to store mentions under (defaults to the brand name)
    #[arg(long)]
    pub(crate) brand_id: Option<String>,

    /// Text to analyze
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub(crate) text: Option<String>,

    /// Read the text to analyze from a file
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,

    /// Citation source to track against the mention (repeatable)
    #[arg(long = "citation")]
    pub(crate) citations: Vec<String>,

    /// JSON file with an array of `{name, position, sentiment}` competitor mentions
    #[arg(long)]
    pub(crate) competitors: Option<PathBuf>,

    /// Number of responses the competitor mentions were drawn from
    #[arg(long)]
    pub(crate) total_responses: Option<usize>,
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_competitors(path: &Path) -> anyhow::Result<Vec<CompetitorMention>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| {
        format!(
            "{} is not a JSON array of competitor mentions",
            path.display()
        )
    })
}

pub(crate) async fn build_context(args: &AnalysisArgs) -> anyhow::Result<RunnerContext> {
    let content = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("either --text or --file is required"),
    };
    let competitors = match &args.competitors {
        Some(path) => read_competitors(path).await?,
        None => Vec::new(),
    };
    let brand_id = args.brand_id.clone().unwrap_or_else(|| args.brand.clone());

    Ok(RunnerContext::new()
        .with_brand(brand_id, args.brand.clone())
        .with_content(content)
        .with_citations(args.citations.iter().cloned())
        .with_competitors(competitors, args.total_responses))
}

fn finish(result: &RunnerResult) -> anyhow::Result<()> {
    print_json(result)?;
    match &result.error {
        Some(error) => anyhow::bail!("runner failed with {}: {}", error.code, error.message),
        None => Ok(()),
    }
}

pub(crate) async fn run_analyze(services: &Services, args: &AnalysisArgs) -> anyhow::Result<()> {
    let ctx = build_context(args).await?;
    let result = services
        .orchestrator
        .run_one(mention_analysis::NAME, &ctx)
        .await;
    finish(&result)
}

pub(crate) async fn run_all(services: &Services, args: &AnalysisArgs) -> anyhow::Result<()> {
    let ctx = build_context(args).await?;
    let results = services.orchestrator.run_all(&ctx).await;
    let failed = results.values().filter(|r| !r.success).count();
    print_json(&results)?;
    if failed > 0 {
        anyhow::bail!("{failed} of {} runners failed", results.len());
    }
    Ok(())
}

pub(crate) async fn run_health(
    services: &Services,
    brand_id: &str,
    days: Option<u32>,
) -> anyhow::Result<()> {
    let window = days.map(|d| TimeWindow::trailing_days(Utc::now(), d));
    let health = services.analytics.health.get(brand_id, window).await?;
    print_json(&health)
}

pub(crate) async fn run_competitive(
    file: &Path,
    total_responses: usize,
    brand: Option<&str>,
) -> anyhow::Result<()> {
    let mentions = read_competitors(file).await?;
    let stats = aggregate(&mentions, total_responses)?;
    let ranked = rank(stats.into_values());
    let relative = brand.map(|b| relative_position(b, &ranked));
    print_json(&json!({
        "ranking": ranked,
        "relativePosition": relative,
    }))
}

pub(crate) async fn run_authority(services: &Services, source: &str) -> anyhow::Result<()> {
    let authority = services.analytics.authority.score(source).await?;
    print_json(&json!({
        "source": source,
        "domain": normalize_domain(source),
        "authority": authority,
    }))
}

pub(crate) async fn run_list_runners(services: &Services) -> anyhow::Result<()> {
    let statuses: Vec<_> = services
        .orchestrator
        .statuses()
        .await
        .into_iter()
        .map(|s| match s.enabled {
            Ok(enabled) => json!({ "name": s.name, "enabled": enabled }),
            Err(error) => json!({ "name": s.name, "enabled": false, "error": error }),
        })
        .collect();
    print_json(&statuses)
}
