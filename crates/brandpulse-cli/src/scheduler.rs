//! Periodic brand-health summaries for `brandpulse watch`.

use std::sync::Arc;

use brandpulse_analytics::BrandHealthAggregator;
use futures::stream::{self, StreamExt};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const MAX_CONCURRENT_BRANDS: usize = 4;

/// Build and start a scheduler that summarizes `brands` on `cron`.
///
/// The returned handle must be kept alive; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot start.
pub(crate) async fn build_scheduler(
    cron: &str,
    health: Arc<BrandHealthAggregator>,
    brands: Vec<String>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let brands = Arc::new(brands);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let health = Arc::clone(&health);
        let brands = Arc::clone(&brands);

        Box::pin(async move {
            tracing::info!(
                brands = brands.len(),
                "scheduler: starting brand-health run"
            );
            summarize_brands(&health, &brands).await;
            tracing::info!("scheduler: brand-health run complete");
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Log one health summary per brand. Failures are logged and skipped.
pub(crate) async fn summarize_brands(health: &BrandHealthAggregator, brands: &[String]) -> usize {
    let futures: Vec<_> = brands
        .iter()
        .map(|brand| summarize_brand(health, brand))
        .collect();
    let outcomes: Vec<bool> = stream::iter(futures)
        .buffer_unordered(MAX_CONCURRENT_BRANDS)
        .collect()
        .await;

    outcomes.into_iter().filter(|ok| *ok).count()
}

async fn summarize_brand(health: &BrandHealthAggregator, brand: &String) -> bool {
    match health.get(brand, None).await {
        Ok(summary) => {
            tracing::info!(
                brand = %brand,
                mentions = summary.mention_count,
                overall_sentiment = summary.overall_sentiment,
                trend_days = summary.trend.len(),
                citations = summary.top_citations.len(),
                "brand health"
            );
            true
        }
        Err(e) => {
            tracing::error!(brand = %brand, error = %e, "scheduler: brand health failed");
            false
        }
    }
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("received ctrl-c, stopping scheduler");
}
