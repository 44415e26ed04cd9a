//! In-memory [`MentionStore`] used when no database is configured and in tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use brandpulse_core::{
    Citation, CitationFilter, CitationOrder, Mention, MentionQuery, MentionStore,
    MentionWithCitations, NewCitation, NewMention, StoreError, TrendPoint,
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    mentions: RwLock<HashMap<Uuid, Mention>>,
    citations: RwLock<HashMap<Uuid, Citation>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn sort_citations(citations: &mut [Citation], order: CitationOrder) {
    match order {
        CitationOrder::AuthorityDesc => citations.sort_by(|a, b| {
            b.authority_score
                .total_cmp(&a.authority_score)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        }),
        CitationOrder::NewestFirst => citations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live mentions across all brands.
    #[must_use]
    pub fn mention_count(&self) -> usize {
        read(&self.mentions)
            .values()
            .filter(|m| m.deleted_at.is_none())
            .count()
    }

    #[must_use]
    pub fn citation_count(&self) -> usize {
        read(&self.citations).len()
    }
}

#[async_trait]
impl MentionStore for InMemoryStore {
    async fn save_mention(&self, mention: NewMention) -> Result<Mention, StoreError> {
        let saved = Mention {
            id: Uuid::new_v4(),
            brand_id: mention.brand_id,
            content: mention.content,
            sentiment_score: mention.sentiment_score,
            magnitude: mention.magnitude,
            context_metadata: mention.context_metadata,
            mentioned_at: mention.mentioned_at,
            deleted_at: None,
        };
        write(&self.mentions).insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn find_mentions_by_brand(
        &self,
        brand_id: &str,
        query: &MentionQuery,
    ) -> Result<Vec<Mention>, StoreError> {
        let mut found: Vec<Mention> = read(&self.mentions)
            .values()
            .filter(|m| m.brand_id == brand_id && m.deleted_at.is_none())
            .filter(|m| query.window.is_none_or(|w| w.contains(m.mentioned_at)))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.mentioned_at
                .cmp(&a.mentioned_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        found.truncate(query.limit);
        Ok(found)
    }

    async fn find_mention_with_citations(
        &self,
        id: Uuid,
    ) -> Result<Option<MentionWithCitations>, StoreError> {
        let Some(mention) = read(&self.mentions)
            .get(&id)
            .filter(|m| m.deleted_at.is_none())
            .cloned()
        else {
            return Ok(None);
        };

        let mut citations: Vec<Citation> = read(&self.citations)
            .values()
            .filter(|c| c.mention_id == id)
            .cloned()
            .collect();
        sort_citations(&mut citations, CitationOrder::AuthorityDesc);

        Ok(Some(MentionWithCitations { mention, citations }))
    }

    async fn sentiment_trend(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TrendPoint>, StoreError> {
        let mut buckets: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
        for mention in read(&self.mentions).values() {
            if mention.brand_id != brand_id
                || mention.deleted_at.is_some()
                || mention.mentioned_at < start
                || mention.mentioned_at > end
            {
                continue;
            }
            let bucket = buckets
                .entry(mention.mentioned_at.date_naive())
                .or_insert((0.0, 0));
            bucket.0 += mention.sentiment_score;
            bucket.1 += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(date, (sum, n))| TrendPoint {
                date,
                average_sentiment: sum / f64::from(n),
            })
            .collect())
    }

    async fn save_citation(&self, citation: NewCitation) -> Result<Citation, StoreError> {
        // Lock order is mentions then citations; the mention guard is held
        // across the insert so a concurrent soft delete cannot orphan it.
        let mentions = read(&self.mentions);
        if !mentions
            .get(&citation.mention_id)
            .is_some_and(|m| m.deleted_at.is_none())
        {
            return Err(StoreError::MentionNotFound(citation.mention_id));
        }

        let saved = Citation {
            id: Uuid::new_v4(),
            mention_id: citation.mention_id,
            source: citation.source,
            text: citation.text,
            authority_score: citation.authority_score,
            metadata: citation.metadata,
            created_at: Utc::now(),
        };
        write(&self.citations).insert(saved.id, saved.clone());
        drop(mentions);
        Ok(saved)
    }

    async fn find_citations(
        &self,
        filter: &CitationFilter,
        order: CitationOrder,
        limit: usize,
    ) -> Result<Vec<Citation>, StoreError> {
        let mut found: Vec<Citation> = read(&self.citations)
            .values()
            .filter(|c| match filter {
                CitationFilter::All => true,
                CitationFilter::Mention(id) => c.mention_id == *id,
                CitationFilter::Mentions(ids) => ids.contains(&c.mention_id),
            })
            .cloned()
            .collect();
        sort_citations(&mut found, order);
        found.truncate(limit);
        Ok(found)
    }

    async fn soft_delete_mention(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut mentions = write(&self.mentions);
        match mentions.get_mut(&id) {
            Some(mention) if mention.deleted_at.is_none() => {
                mention.deleted_at = Some(Utc::now());
            }
            _ => return Ok(false),
        }
        write(&self.citations).retain(|_, c| c.mention_id != id);
        drop(mentions);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use brandpulse_core::TimeWindow;

    use super::*;

    fn new_mention(brand: &str, sentiment: f64, at: DateTime<Utc>) -> NewMention {
        NewMention {
            brand_id: brand.to_string(),
            content: format!("{brand} text"),
            sentiment_score: sentiment,
            magnitude: 1.0,
            context_metadata: json!({}),
            mentioned_at: at,
        }
    }

    fn new_citation(mention_id: Uuid, source: &str, authority: f64) -> NewCitation {
        NewCitation {
            mention_id,
            source: source.to_string(),
            text: source.to_string(),
            authority_score: authority,
            metadata: json!({}),
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn mentions_come_back_newest_first_within_limit() {
        let store = InMemoryStore::new();
        for d in 1..=5 {
            store.save_mention(new_mention("acme", 0.1, day(d))).await.unwrap();
        }
        store.save_mention(new_mention("other", 0.1, day(6))).await.unwrap();

        let found = store
            .find_mentions_by_brand(
                "acme",
                &MentionQuery {
                    window: None,
                    limit: 3,
                },
            )
            .await
            .unwrap();
        let dates: Vec<_> = found.iter().map(|m| m.mentioned_at).collect();
        assert_eq!(dates, vec![day(5), day(4), day(3)]);
    }

    #[tokio::test]
    async fn window_filters_mentions() {
        let store = InMemoryStore::new();
        for d in 1..=10 {
            store.save_mention(new_mention("acme", 0.0, day(d))).await.unwrap();
        }
        let query = MentionQuery {
            window: Some(TimeWindow {
                start: day(3),
                end: day(5),
            }),
            limit: 100,
        };
        let found = store.find_mentions_by_brand("acme", &query).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn trend_buckets_by_day() {
        let store = InMemoryStore::new();
        store.save_mention(new_mention("acme", 1.0, day(2))).await.unwrap();
        store
            .save_mention(new_mention("acme", 0.0, day(2) + Duration::hours(3)))
            .await
            .unwrap();
        store.save_mention(new_mention("acme", -0.5, day(4))).await.unwrap();

        let trend = store.sentiment_trend("acme", day(1), day(30)).await.unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, day(2).date_naive());
        assert!((trend[0].average_sentiment - 0.5).abs() < 1e-9);
        assert!((trend[1].average_sentiment + 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn citation_requires_live_mention() {
        let store = InMemoryStore::new();
        let err = store
            .save_citation(new_citation(Uuid::new_v4(), "github.com", 0.85))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MentionNotFound(_)));
    }

    #[tokio::test]
    async fn citations_order_by_authority() {
        let store = InMemoryStore::new();
        let mention = store.save_mention(new_mention("acme", 0.0, day(1))).await.unwrap();
        store.save_citation(new_citation(mention.id, "a.com", 0.6)).await.unwrap();
        store.save_citation(new_citation(mention.id, "b.gov", 0.9)).await.unwrap();
        store.save_citation(new_citation(mention.id, "c.info", 0.4)).await.unwrap();

        let found = store
            .find_mention_with_citations(mention.id)
            .await
            .unwrap()
            .unwrap();
        let sources: Vec<_> = found.citations.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["b.gov", "a.com", "c.info"]);

        let top = store
            .find_citations(&CitationFilter::All, CitationOrder::AuthorityDesc, 2)
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].source, "b.gov");
    }

    #[tokio::test]
    async fn soft_delete_hides_mention_and_drops_citations() {
        let store = InMemoryStore::new();
        let mention = store.save_mention(new_mention("acme", 0.3, day(1))).await.unwrap();
        store.save_citation(new_citation(mention.id, "a.com", 0.6)).await.unwrap();

        assert!(store.soft_delete_mention(mention.id).await.unwrap());
        assert!(!store.soft_delete_mention(mention.id).await.unwrap());

        assert_eq!(store.mention_count(), 0);
        assert_eq!(store.citation_count(), 0);
        assert!(store
            .find_mention_with_citations(mention.id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .sentiment_trend("acme", day(1) - Duration::days(1), day(2))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store
                .save_citation(new_citation(mention.id, "b.com", 0.6))
                .await
                .unwrap_err(),
            StoreError::MentionNotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_delete_never_leaves_orphan_citations() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        for _ in 0..500 {
            let mention = store.save_mention(new_mention("acme", 0.1, day(1))).await.unwrap();
            let saver = {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .save_citation(new_citation(mention.id, "a.com", 0.6))
                        .await
                })
            };
            let deleter = {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move { store.soft_delete_mention(mention.id).await })
            };
            let _ = saver.await.unwrap();
            assert!(deleter.await.unwrap().unwrap());
        }

        assert_eq!(store.mention_count(), 0);
        assert_eq!(store.citation_count(), 0);
    }
}
