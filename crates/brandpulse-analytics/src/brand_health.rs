//! Brand-health roll-up over a time window of stored mentions.

use std::sync::Arc;

use brandpulse_core::{
    AppConfig, Citation, CitationScope, MentionQuery, MentionStore, TimeWindow, TrendPoint,
};
use chrono::Utc;
use serde::Serialize;

use crate::citations::{CitationTracker, DEFAULT_TOP_CITATIONS};
use crate::error::AnalyticsError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandHealth {
    pub overall_sentiment: f64,
    pub trend: Vec<TrendPoint>,
    /// Mentions fetched for the window, bounded by the mention limit.
    pub mention_count: usize,
    pub top_citations: Vec<Citation>,
}

impl BrandHealth {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            overall_sentiment: 0.0,
            trend: Vec::new(),
            mention_count: 0,
            top_citations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrandHealthSettings {
    pub window_days: u32,
    pub mention_limit: usize,
    pub citation_limit: usize,
    pub citation_scope: CitationScope,
}

impl Default for BrandHealthSettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            mention_limit: 100,
            citation_limit: DEFAULT_TOP_CITATIONS,
            citation_scope: CitationScope::AllMentions,
        }
    }
}

impl BrandHealthSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            window_days: config.health_window_days,
            mention_limit: config.health_mention_limit,
            citation_limit: DEFAULT_TOP_CITATIONS,
            citation_scope: config.health_citation_scope,
        }
    }
}

pub struct BrandHealthAggregator {
    store: Arc<dyn MentionStore>,
    citations: CitationTracker,
    settings: BrandHealthSettings,
}

impl BrandHealthAggregator {
    pub fn new(
        store: Arc<dyn MentionStore>,
        citations: CitationTracker,
        settings: BrandHealthSettings,
    ) -> Self {
        Self {
            store,
            citations,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &BrandHealthSettings {
        &self.settings
    }

    /// Summarize `brand_id` over `window`, or the trailing configured days when `None`.
    ///
    /// # Errors
    ///
    /// Returns `MISSING_BRAND_ID` for a blank id, `INVALID_WINDOW` when the
    /// window ends before it starts, and propagates store failures.
    pub async fn get(
        &self,
        brand_id: &str,
        window: Option<TimeWindow>,
    ) -> Result<BrandHealth, AnalyticsError> {
        if brand_id.trim().is_empty() {
            return Err(AnalyticsError::validation(
                "MISSING_BRAND_ID",
                "brand id must be non-empty",
            ));
        }
        let window = window
            .unwrap_or_else(|| TimeWindow::trailing_days(Utc::now(), self.settings.window_days));
        if window.end < window.start {
            return Err(AnalyticsError::validation(
                "INVALID_WINDOW",
                format!("window ends ({}) before it starts ({})", window.end, window.start),
            ));
        }

        let query = MentionQuery {
            window: Some(window),
            limit: self.settings.mention_limit,
        };
        let (mentions, trend) = tokio::try_join!(
            self.store.find_mentions_by_brand(brand_id, &query),
            self.store.sentiment_trend(brand_id, window.start, window.end),
        )?;

        if mentions.is_empty() {
            tracing::debug!(brand = brand_id, "no mentions in window");
            return Ok(BrandHealth {
                trend,
                ..BrandHealth::empty()
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let overall_sentiment =
            mentions.iter().map(|m| m.sentiment_score).sum::<f64>() / mentions.len() as f64;

        let scoped_ids: Vec<_> = match self.settings.citation_scope {
            CitationScope::AllMentions => mentions.iter().map(|m| m.id).collect(),
            CitationScope::FirstMention => mentions.iter().take(1).map(|m| m.id).collect(),
        };
        let top_citations = self
            .citations
            .top_citations_for(&scoped_ids, self.settings.citation_limit)
            .await?;

        tracing::debug!(
            brand = brand_id,
            mentions = mentions.len(),
            citations = top_citations.len(),
            overall_sentiment,
            "brand health computed"
        );

        Ok(BrandHealth {
            overall_sentiment,
            trend,
            mention_count: mentions.len(),
            top_citations,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use brandpulse_core::NewMention;
    use chrono::{DateTime, Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::authority::{AuthorityScorer, AuthorityTable};
    use crate::memory::InMemoryStore;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    fn march() -> TimeWindow {
        TimeWindow {
            start: at(1) - Duration::hours(9),
            end: at(31),
        }
    }

    fn aggregator(
        store: Arc<InMemoryStore>,
        settings: BrandHealthSettings,
    ) -> (BrandHealthAggregator, CitationTracker) {
        let authority = Arc::new(AuthorityScorer::new(
            AuthorityTable::default(),
            NonZeroUsize::new(32).unwrap(),
            AuthorityScorer::DEFAULT_TTL,
        ));
        let tracker = CitationTracker::new(store.clone(), authority);
        (
            BrandHealthAggregator::new(store, tracker.clone(), settings),
            tracker,
        )
    }

    async fn save(store: &InMemoryStore, sentiment: f64, when: DateTime<Utc>) -> uuid::Uuid {
        store
            .save_mention(NewMention {
                brand_id: "acme".to_string(),
                content: "Acme".to_string(),
                sentiment_score: sentiment,
                magnitude: 1.0,
                context_metadata: json!({}),
                mentioned_at: when,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn empty_window_is_all_zero() {
        let store = Arc::new(InMemoryStore::new());
        let (health, _) = aggregator(store, BrandHealthSettings::default());

        let result = health.get("acme", Some(march())).await.unwrap();
        assert_eq!(result, BrandHealth::empty());
    }

    #[tokio::test]
    async fn blank_brand_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let (health, _) = aggregator(store, BrandHealthSettings::default());
        let err = health.get(" ", None).await.unwrap_err();
        assert_eq!(err.code(), "MISSING_BRAND_ID");
    }

    #[tokio::test]
    async fn inverted_window_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let (health, _) = aggregator(store, BrandHealthSettings::default());
        let window = TimeWindow {
            start: at(10),
            end: at(1),
        };
        let err = health.get("acme", Some(window)).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_WINDOW");
    }

    #[tokio::test]
    async fn rolls_up_sentiment_trend_and_citations() {
        let store = Arc::new(InMemoryStore::new());
        let (health, tracker) = aggregator(store.clone(), BrandHealthSettings::default());

        let older = save(&store, 0.5, at(2)).await;
        let newer = save(&store, -0.1, at(5)).await;
        tracker.track("https://nih.gov", older, None).await.unwrap();
        tracker.track("example.com", newer, None).await.unwrap();

        let result = health.get("acme", Some(march())).await.unwrap();
        assert_eq!(result.mention_count, 2);
        assert!((result.overall_sentiment - 0.2).abs() < 1e-9);
        assert_eq!(result.trend.len(), 2);
        let sources: Vec<_> = result
            .top_citations
            .iter()
            .map(|c| c.source.as_str())
            .collect();
        assert_eq!(sources, vec!["https://nih.gov", "example.com"]);
    }

    #[tokio::test]
    async fn first_mention_scope_only_reads_newest_mention() {
        let store = Arc::new(InMemoryStore::new());
        let settings = BrandHealthSettings {
            citation_scope: CitationScope::FirstMention,
            ..BrandHealthSettings::default()
        };
        let (health, tracker) = aggregator(store.clone(), settings);

        let older = save(&store, 0.5, at(2)).await;
        let newer = save(&store, 0.5, at(5)).await;
        tracker.track("https://nih.gov", older, None).await.unwrap();
        tracker.track("example.com", newer, None).await.unwrap();

        let result = health.get("acme", Some(march())).await.unwrap();
        assert_eq!(result.top_citations.len(), 1);
        assert_eq!(result.top_citations[0].source, "example.com");
    }

    #[tokio::test]
    async fn mention_limit_bounds_the_count() {
        let store = Arc::new(InMemoryStore::new());
        let settings = BrandHealthSettings {
            mention_limit: 3,
            ..BrandHealthSettings::default()
        };
        let (health, _) = aggregator(store.clone(), settings);
        for day in 1..=6 {
            save(&store, 0.0, at(day)).await;
        }

        let result = health.get("acme", Some(march())).await.unwrap();
        assert_eq!(result.mention_count, 3);
        assert_eq!(result.trend.len(), 6);
    }

    #[tokio::test]
    async fn citations_are_capped_at_limit() {
        let store = Arc::new(InMemoryStore::new());
        let (health, tracker) = aggregator(store.clone(), BrandHealthSettings::default());
        let id = save(&store, 0.0, at(3)).await;
        for n in 0..15 {
            tracker
                .track(&format!("site{n}.example.com"), id, None)
                .await
                .unwrap();
        }

        let result = health.get("acme", Some(march())).await.unwrap();
        assert_eq!(result.top_citations.len(), DEFAULT_TOP_CITATIONS);
    }
}
