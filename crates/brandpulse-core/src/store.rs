//! Persistence port consumed by the analytics pipeline.
//!
//! Mentions and citations are separate collections keyed by id. A citation
//! refers to its mention by id only; deleting a mention removes its citations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Citation, CitationFilter, CitationOrder, Mention, MentionQuery, MentionWithCitations,
    NewCitation, NewMention, TrendPoint,
};

/// Failures raised by a [`MentionStore`] backend. Never retried by callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mention {0} does not exist")]
    MentionNotFound(Uuid),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait MentionStore: Send + Sync {
    async fn save_mention(&self, mention: NewMention) -> Result<Mention, StoreError>;

    /// Live (not soft-deleted) mentions for a brand, newest first, capped at `query.limit`.
    async fn find_mentions_by_brand(
        &self,
        brand_id: &str,
        query: &MentionQuery,
    ) -> Result<Vec<Mention>, StoreError>;

    async fn find_mention_with_citations(
        &self,
        id: Uuid,
    ) -> Result<Option<MentionWithCitations>, StoreError>;

    /// Day-bucketed mean sentiment for live mentions in `[start, end]`, oldest day first.
    async fn sentiment_trend(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TrendPoint>, StoreError>;

    /// Persist a citation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MentionNotFound`] when `citation.mention_id` does not
    /// reference a live mention.
    async fn save_citation(&self, citation: NewCitation) -> Result<Citation, StoreError>;

    async fn find_citations(
        &self,
        filter: &CitationFilter,
        order: CitationOrder,
        limit: usize,
    ) -> Result<Vec<Citation>, StoreError>;

    /// Soft-delete a mention and drop its citations. Returns `false` if no live
    /// mention had that id.
    async fn soft_delete_mention(&self, id: Uuid) -> Result<bool, StoreError>;
}
