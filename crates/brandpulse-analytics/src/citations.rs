//! Persists authority-scored citations against mentions.

use std::sync::Arc;

use brandpulse_core::{Citation, CitationFilter, CitationOrder, MentionStore, NewCitation};
use serde_json::Value;
use uuid::Uuid;

use crate::authority::AuthorityScorer;
use crate::error::AnalyticsError;

pub const DEFAULT_TOP_CITATIONS: usize = 10;

#[derive(Clone)]
pub struct CitationTracker {
    store: Arc<dyn MentionStore>,
    authority: Arc<AuthorityScorer>,
}

impl CitationTracker {
    pub fn new(store: Arc<dyn MentionStore>, authority: Arc<AuthorityScorer>) -> Self {
        Self { store, authority }
    }

    /// Score `source` and store it as a citation of `mention_id`. The source
    /// string doubles as the citation's display text.
    ///
    /// # Errors
    ///
    /// Returns `MISSING_SOURCE` for a blank source, [`AnalyticsError::NotFound`]
    /// when the mention does not exist, or the store's failure unchanged.
    pub async fn track(
        &self,
        source: &str,
        mention_id: Uuid,
        metadata: Option<Value>,
    ) -> Result<Citation, AnalyticsError> {
        let authority_score = self.authority.score(source).await?;
        let citation = self
            .store
            .save_citation(NewCitation {
                mention_id,
                source: source.to_string(),
                text: source.to_string(),
                authority_score,
                metadata: metadata.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            })
            .await?;

        tracing::debug!(
            mention = %mention_id,
            source,
            authority = authority_score,
            "citation tracked"
        );
        Ok(citation)
    }

    /// Citations of one mention, highest authority first.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::NotFound`] when the mention does not exist.
    pub async fn citations_by_mention(
        &self,
        mention_id: Uuid,
    ) -> Result<Vec<Citation>, AnalyticsError> {
        let found = self
            .store
            .find_mention_with_citations(mention_id)
            .await?
            .ok_or_else(|| AnalyticsError::NotFound(format!("mention {mention_id}")))?;

        let mut citations = found.citations;
        citations.sort_by(|a, b| b.authority_score.total_cmp(&a.authority_score));
        Ok(citations)
    }

    /// Highest-authority citations across every mention.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn top_citations(&self, limit: usize) -> Result<Vec<Citation>, AnalyticsError> {
        Ok(self
            .store
            .find_citations(&CitationFilter::All, CitationOrder::AuthorityDesc, limit)
            .await?)
    }

    /// Highest-authority citations across the given mentions.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn top_citations_for(
        &self,
        mention_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<Citation>, AnalyticsError> {
        if mention_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .find_citations(
                &CitationFilter::Mentions(mention_ids.to_vec()),
                CitationOrder::AuthorityDesc,
                limit,
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use brandpulse_core::NewMention;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::authority::AuthorityTable;
    use crate::memory::InMemoryStore;

    fn tracker() -> (Arc<InMemoryStore>, CitationTracker) {
        let store = Arc::new(InMemoryStore::new());
        let authority = Arc::new(AuthorityScorer::new(
            AuthorityTable::default(),
            NonZeroUsize::new(64).unwrap(),
            AuthorityScorer::DEFAULT_TTL,
        ));
        let tracker = CitationTracker::new(store.clone(), authority);
        (store, tracker)
    }

    async fn mention(store: &InMemoryStore) -> Uuid {
        store
            .save_mention(NewMention {
                brand_id: "acme".to_string(),
                content: "Acme".to_string(),
                sentiment_score: 0.0,
                magnitude: 0.0,
                context_metadata: json!({}),
                mentioned_at: Utc::now(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn track_scores_and_persists() {
        let (store, tracker) = tracker();
        let id = mention(&store).await;

        let citation = tracker
            .track("https://github.com/acme", id, Some(json!({"rank": 1})))
            .await
            .unwrap();

        assert_eq!(citation.mention_id, id);
        assert_eq!(citation.text, "https://github.com/acme");
        assert!((citation.authority_score - 0.9).abs() < 1e-9);
        assert_eq!(citation.metadata["rank"], 1);
        assert_eq!(store.citation_count(), 1);
    }

    #[tokio::test]
    async fn track_against_missing_mention_is_not_found() {
        let (_, tracker) = tracker();
        let err = tracker
            .track("github.com", Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn by_mention_orders_by_authority() {
        let (store, tracker) = tracker();
        let id = mention(&store).await;
        for source in ["blog.example.com", "https://nih.gov/x", "example.org"] {
            tracker.track(source, id, None).await.unwrap();
        }

        let citations = tracker.citations_by_mention(id).await.unwrap();
        let sources: Vec<_> = citations.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["https://nih.gov/x", "example.org", "blog.example.com"]);
    }

    #[tokio::test]
    async fn by_mention_for_unknown_mention_is_not_found() {
        let (_, tracker) = tracker();
        let err = tracker.citations_by_mention(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn top_citations_spans_mentions_and_respects_limit() {
        let (store, tracker) = tracker();
        let first = mention(&store).await;
        let second = mention(&store).await;
        tracker.track("example.com", first, None).await.unwrap();
        tracker.track("https://nih.gov", second, None).await.unwrap();
        tracker.track("example.info", second, None).await.unwrap();

        let top = tracker.top_citations(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].source, "https://nih.gov");
        assert_eq!(top[1].source, "example.com");

        let scoped = tracker.top_citations_for(&[first], 10).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(tracker.top_citations_for(&[], 10).await.unwrap().is_empty());
    }
}
