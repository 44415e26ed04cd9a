//! [`MentionStore`] backed by Postgres.

use async_trait::async_trait;
use brandpulse_core::{
    Citation, CitationFilter, CitationOrder, Mention, MentionQuery, MentionStore,
    MentionWithCitations, NewCitation, NewMention, StoreError, TrendPoint,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{citations, mentions};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl MentionStore for PgStore {
    async fn save_mention(&self, mention: NewMention) -> Result<Mention, StoreError> {
        let row = mentions::insert_mention(&self.pool, &mention).await?;
        Ok(row.into())
    }

    async fn find_mentions_by_brand(
        &self,
        brand_id: &str,
        query: &MentionQuery,
    ) -> Result<Vec<Mention>, StoreError> {
        let window = query.window.map(|w| (w.start, w.end));
        let rows =
            mentions::list_mentions_by_brand(&self.pool, brand_id, window, sql_limit(query.limit))
                .await?;
        Ok(rows.into_iter().map(Mention::from).collect())
    }

    async fn find_mention_with_citations(
        &self,
        id: Uuid,
    ) -> Result<Option<MentionWithCitations>, StoreError> {
        let Some(row) = mentions::get_mention(&self.pool, id).await? else {
            return Ok(None);
        };
        let citations = citations::list_citations(
            &self.pool,
            &CitationFilter::Mention(id),
            CitationOrder::AuthorityDesc,
            i64::MAX,
        )
        .await?;
        Ok(Some(MentionWithCitations {
            mention: row.into(),
            citations: citations.into_iter().map(Citation::from).collect(),
        }))
    }

    async fn sentiment_trend(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TrendPoint>, StoreError> {
        Ok(mentions::sentiment_trend(&self.pool, brand_id, start, end).await?)
    }

    async fn save_citation(&self, citation: NewCitation) -> Result<Citation, StoreError> {
        citations::insert_citation(&self.pool, &citation)
            .await?
            .map(Citation::from)
            .ok_or(StoreError::MentionNotFound(citation.mention_id))
    }

    async fn find_citations(
        &self,
        filter: &CitationFilter,
        order: CitationOrder,
        limit: usize,
    ) -> Result<Vec<Citation>, StoreError> {
        let rows = citations::list_citations(&self.pool, filter, order, sql_limit(limit)).await?;
        Ok(rows.into_iter().map(Citation::from).collect())
    }

    async fn soft_delete_mention(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(mentions::soft_delete_mention(&self.pool, id).await?)
    }
}
