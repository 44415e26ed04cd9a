//! Detects and scores a brand in one response, then persists the mention and
//! its citations.

use std::sync::Arc;

use async_trait::async_trait;
use brandpulse_analytics::{
    aggregate, detect_mentions, rank, relative_position, Analytics, AnalyticsError,
};
use brandpulse_core::{Citation, FeatureFlags, NewMention};
use chrono::Utc;
use futures::future::try_join_all;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::runner::{FeatureRunner, FlagGate, RunnerContext, RunnerResult};

pub const NAME: &str = "mention-analysis";
pub const FLAG: &str = "runners.mention_analysis.enabled";

pub struct MentionAnalysisRunner {
    analytics: Analytics,
    gate: FlagGate,
}

impl MentionAnalysisRunner {
    #[must_use]
    pub fn new(analytics: Analytics, flags: Arc<FeatureFlags>) -> Self {
        Self {
            analytics,
            gate: FlagGate::new(flags, FLAG, true),
        }
    }

    async fn track_citations(
        &self,
        sources: &[String],
        mention_id: Uuid,
    ) -> Result<Vec<Citation>, AnalyticsError> {
        try_join_all(sources.iter().enumerate().map(|(rank, source)| {
            self.analytics
                .citations
                .track(source, mention_id, Some(json!({ "rank": rank + 1 })))
        }))
        .await
    }
}

#[async_trait]
impl FeatureRunner for MentionAnalysisRunner {
    fn name(&self) -> &str {
        NAME
    }

    async fn is_enabled(&self) -> anyhow::Result<bool> {
        self.gate.check()
    }

    async fn run(&self, ctx: &RunnerContext) -> anyhow::Result<RunnerResult> {
        let Some(content) = ctx.content.as_deref().filter(|c| !c.trim().is_empty()) else {
            return Ok(RunnerResult::failure(
                "MISSING_CONTENT",
                "content is required for mention analysis",
            ));
        };
        let non_blank = |s: &&str| !s.trim().is_empty();
        let Some(brand_name) = ctx
            .brand_name
            .as_deref()
            .filter(non_blank)
            .or_else(|| ctx.brand_id.as_deref().filter(non_blank))
        else {
            return Ok(RunnerResult::failure(
                "MISSING_BRAND",
                "a brand name or id is required for mention analysis",
            ));
        };
        let brand_id = ctx.brand_id.as_deref().filter(non_blank).unwrap_or(brand_name);

        // Everything that can reject the input runs before the mention is saved.
        if let Some(index) = ctx.citations.iter().position(|s| s.trim().is_empty()) {
            return Ok(RunnerResult::failure(
                "MISSING_SOURCE",
                "citation source must be non-empty",
            )
            .with_details(json!({ "index": index })));
        }
        let competitive = if ctx.competitors.is_empty() {
            Value::Null
        } else {
            let total = ctx.total_responses.unwrap_or(ctx.competitors.len());
            let stats = match aggregate(&ctx.competitors, total) {
                Ok(stats) => stats,
                Err(e) => return Ok(RunnerResult::from(&e)),
            };
            let ranked = rank(stats.into_values());
            json!({
                "relativePosition": relative_position(brand_name, &ranked),
                "ranking": ranked,
            })
        };

        if let Some(expired) = ctx.check_deadline("mention detection") {
            return Ok(expired);
        }
        let scan = detect_mentions(content, brand_name);

        let sentiment = match self.analytics.sentiment.analyze(content).await {
            Ok(sentiment) => sentiment,
            Err(e) => return Ok(RunnerResult::from(&e)),
        };

        if let Some(expired) = ctx.check_deadline("saving mention") {
            return Ok(expired);
        }
        let context_metadata = json!({
            "requestId": ctx.request_id,
            "brandName": brand_name,
            "prominence": scan.prominence,
            "mentionCount": scan.mention_count,
            "positions": scan.positions,
            "totalTokens": scan.total_tokens,
            "aspects": sentiment.aspects,
            "extra": ctx.metadata,
        });
        let mention = match self
            .analytics
            .store
            .save_mention(NewMention {
                brand_id: brand_id.to_string(),
                content: content.to_string(),
                sentiment_score: sentiment.score,
                magnitude: sentiment.magnitude,
                context_metadata,
                mentioned_at: Utc::now(),
            })
            .await
        {
            Ok(mention) => mention,
            Err(e) => return Ok(RunnerResult::from(&AnalyticsError::from(e))),
        };

        if let Some(expired) = ctx.check_deadline("tracking citations") {
            return Ok(expired);
        }
        let citations = match self.track_citations(&ctx.citations, mention.id).await {
            Ok(citations) => citations,
            Err(e) => {
                return Ok(RunnerResult::from(&e).with_details(json!({ "mentionId": mention.id })))
            }
        };

        tracing::info!(
            brand = brand_id,
            mention = %mention.id,
            mentions = scan.mention_count,
            prominence = scan.prominence,
            sentiment = sentiment.score,
            citations = citations.len(),
            "mention analyzed"
        );

        Ok(RunnerResult::ok(json!({
            "mention": mention,
            "prominence": scan,
            "sentiment": sentiment,
            "citations": citations,
            "competitive": competitive,
        })))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use brandpulse_analytics::{AnalyticsSettings, CompetitorMention, InMemoryStore};
    use brandpulse_core::{CitationFilter, CitationOrder, MentionQuery, MentionStore};
    use tokio::time::Instant;

    use super::*;

    fn runner() -> (Arc<InMemoryStore>, MentionAnalysisRunner) {
        let store = Arc::new(InMemoryStore::new());
        let analytics = Analytics::new(store.clone(), &AnalyticsSettings::default());
        (
            store,
            MentionAnalysisRunner::new(analytics, Arc::new(FeatureFlags::new())),
        )
    }

    #[tokio::test]
    async fn enabled_by_default_and_flag_can_disable() {
        let (_, default_runner) = runner();
        assert!(default_runner.is_enabled().await.unwrap());

        let store = Arc::new(InMemoryStore::new());
        let analytics = Analytics::new(store, &AnalyticsSettings::default());
        let off = MentionAnalysisRunner::new(
            analytics,
            Arc::new(FeatureFlags::new().with(FLAG, false)),
        );
        assert!(!off.is_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn missing_content_is_reported() {
        let (store, runner) = runner();
        let ctx = RunnerContext::new().with_brand("nike", "Nike").with_content("   ");
        let result = runner.run(&ctx).await.unwrap();
        assert_eq!(result.error_code(), Some("MISSING_CONTENT"));
        assert_eq!(store.mention_count(), 0);
    }

    #[tokio::test]
    async fn missing_brand_is_reported() {
        let (_, runner) = runner();
        let ctx = RunnerContext::new().with_content("Nike is great");
        let result = runner.run(&ctx).await.unwrap();
        assert_eq!(result.error_code(), Some("MISSING_BRAND"));
    }

    #[tokio::test]
    async fn analyzes_and_persists_mention_with_citations() {
        let (store, runner) = runner();
        let ctx = RunnerContext::new()
            .with_brand("nike", "Nike")
            .with_content("Nike is great. Nike's shoes are excellent.")
            .with_citations(["https://nih.gov/study", "blog.example.com"]);

        let result = runner.run(&ctx).await.unwrap();
        assert!(result.success, "{result:?}");
        let data = result.data.unwrap();
        assert_eq!(data["prominence"]["mentionCount"], 2);
        assert!((data["sentiment"]["score"].as_f64().unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(data["citations"].as_array().unwrap().len(), 2);
        assert!(data["competitive"].is_null());

        let saved = store
            .find_mentions_by_brand("nike", &MentionQuery::default())
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].context_metadata["mentionCount"], 2);
        assert_eq!(saved[0].context_metadata["positions"], json!([0, 3]));

        let citations = store
            .find_citations(&CitationFilter::Mention(saved[0].id), CitationOrder::AuthorityDesc, 10)
            .await
            .unwrap();
        assert_eq!(citations[0].source, "https://nih.gov/study");
    }

    #[tokio::test]
    async fn competitive_stats_include_relative_position() {
        let (_, runner) = runner();
        let ctx = RunnerContext::new()
            .with_brand("nike", "Nike")
            .with_content("Nike and Adidas both make shoes")
            .with_competitors(
                vec![
                    CompetitorMention {
                        name: "Nike".to_string(),
                        position: 3,
                        sentiment: 0.5,
                    },
                    CompetitorMention {
                        name: "Adidas".to_string(),
                        position: 1,
                        sentiment: 0.0,
                    },
                ],
                Some(2),
            );

        let data = runner.run(&ctx).await.unwrap().data.unwrap();
        assert!((data["competitive"]["relativePosition"].as_f64().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(data["competitive"]["ranking"][0]["name"], "Nike");
    }

    #[tokio::test]
    async fn invalid_competitor_data_keeps_its_code() {
        let (store, runner) = runner();
        let ctx = RunnerContext::new()
            .with_brand("nike", "Nike")
            .with_content("Nike shoes")
            .with_competitors(
                vec![CompetitorMention {
                    name: "Nike".to_string(),
                    position: 42,
                    sentiment: 0.0,
                }],
                Some(1),
            );
        let result = runner.run(&ctx).await.unwrap();
        assert_eq!(result.error_code(), Some("INVALID_POSITION"));
        assert_eq!(store.mention_count(), 0);
    }

    #[tokio::test]
    async fn invalid_citation_source_fails_the_run() {
        let (store, runner) = runner();
        let ctx = RunnerContext::new()
            .with_brand("nike", "Nike")
            .with_content("Nike shoes")
            .with_citations(["github.com", " "]);
        let result = runner.run(&ctx).await.unwrap();
        assert_eq!(result.error_code(), Some("MISSING_SOURCE"));
        assert_eq!(store.mention_count(), 0);
        assert_eq!(store.citation_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_stops_before_work() {
        let (store, runner) = runner();
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_millis(1)).await;
        let ctx = RunnerContext::new()
            .with_brand("nike", "Nike")
            .with_content("Nike shoes")
            .with_deadline(deadline);

        let result = runner.run(&ctx).await.unwrap();
        assert_eq!(result.error_code(), Some(crate::runner::DEADLINE_EXCEEDED));
        assert_eq!(store.mention_count(), 0);
    }
}
