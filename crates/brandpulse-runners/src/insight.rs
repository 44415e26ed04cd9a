//! Summarizes a brand's recent health through the completion provider.

use std::sync::Arc;

use async_trait::async_trait;
use brandpulse_analytics::{Analytics, BrandHealth, CompletionOptions, CompletionProvider};
use brandpulse_core::FeatureFlags;
use serde_json::json;

use crate::runner::{FeatureRunner, FlagGate, RunnerContext, RunnerResult};

pub const NAME: &str = "brand-insight";
pub const FLAG: &str = "runners.brand_insight.enabled";

const SYSTEM_PROMPT: &str =
    "You are a brand analyst. Summarize the brand's standing in three sentences or fewer.";

pub struct BrandInsightRunner {
    analytics: Analytics,
    provider: Option<Arc<dyn CompletionProvider>>,
    gate: FlagGate,
}

impl BrandInsightRunner {
    #[must_use]
    pub fn new(
        analytics: Analytics,
        provider: Option<Arc<dyn CompletionProvider>>,
        flags: Arc<FeatureFlags>,
    ) -> Self {
        Self {
            analytics,
            provider,
            gate: FlagGate::new(flags, FLAG, false),
        }
    }
}

fn build_prompt(brand: &str, health: &BrandHealth) -> String {
    let mut prompt = format!(
        "Brand: {brand}\nMentions analyzed: {}\nOverall sentiment (-1..1): {:.3}\n",
        health.mention_count, health.overall_sentiment
    );
    if !health.trend.is_empty() {
        prompt.push_str("Daily sentiment:\n");
        for point in &health.trend {
            prompt.push_str(&format!(
                "- {}: {:.3}\n",
                point.date, point.average_sentiment
            ));
        }
    }
    if !health.top_citations.is_empty() {
        prompt.push_str("Most authoritative sources:\n");
        for citation in &health.top_citations {
            prompt.push_str(&format!(
                "- {} (authority {:.2})\n",
                citation.source, citation.authority_score
            ));
        }
    }
    prompt
}

#[async_trait]
impl FeatureRunner for BrandInsightRunner {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_enabled(&self) -> anyhow::Result<bool> {
        self.gate.check()
    }

    async fn run(&self, ctx: &RunnerContext) -> anyhow::Result<RunnerResult> {
        let Some(brand_id) = ctx.brand_id.as_deref().filter(|b| !b.trim().is_empty()) else {
            return Ok(RunnerResult::failure(
                "MISSING_BRAND_ID",
                "a brand id is required for brand insight",
            ));
        };
        let Some(provider) = &self.provider else {
            return Ok(RunnerResult::failure(
                "LLM_UNAVAILABLE",
                "no completion provider is configured",
            ));
        };

        if let Some(expired) = ctx.check_deadline("brand health") {
            return Ok(expired);
        }
        let health = match self.analytics.health.get(brand_id, None).await {
            Ok(health) => health,
            Err(e) => return Ok(RunnerResult::from(&e)),
        };

        if let Some(expired) = ctx.check_deadline("completion") {
            return Ok(expired);
        }
        let brand_name = ctx.brand_name.as_deref().unwrap_or(brand_id);
        let options = CompletionOptions {
            system: Some(SYSTEM_PROMPT.to_string()),
            ..CompletionOptions::default()
        };
        let insight = match provider
            .complete(&build_prompt(brand_name, &health), &options)
            .await
        {
            Ok(text) => text,
            Err(e) => return Ok(RunnerResult::from(&e)),
        };

        Ok(RunnerResult::ok(json!({
            "brandId": brand_id,
            "health": health,
            "insight": insight,
        })))
    }
}
