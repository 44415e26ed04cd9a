//! Mention and citation records plus the query shapes the store understands.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A recorded instance of brand-relevant text that has been analyzed.
///
/// Immutable after creation except for soft deletion (`deleted_at`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    pub id: Uuid,
    pub brand_id: String,
    pub content: String,
    /// Polarity in `[-1.0, 1.0]`.
    pub sentiment_score: f64,
    pub magnitude: f64,
    pub context_metadata: Value,
    pub mentioned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for [`crate::MentionStore::save_mention`]. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMention {
    pub brand_id: String,
    pub content: String,
    pub sentiment_score: f64,
    pub magnitude: f64,
    pub context_metadata: Value,
    pub mentioned_at: DateTime<Utc>,
}

/// A sourced reference attached to a mention.
///
/// `mention_id` is a lookup key only; the mention owns the citation's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: Uuid,
    pub mention_id: Uuid,
    pub source: String,
    pub text: String,
    /// Authority in `[0.0, 1.0]`, computed once at creation.
    pub authority_score: f64,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCitation {
    pub mention_id: Uuid,
    pub source: String,
    pub text: String,
    pub authority_score: f64,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionWithCitations {
    #[serde(flatten)]
    pub mention: Mention,
    pub citations: Vec<Citation>,
}

/// One day bucket of the sentiment trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub average_sentiment: f64,
}

/// Inclusive time window used by brand-health queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the `days` days that end at `end`.
    #[must_use]
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Options for [`crate::MentionStore::find_mentions_by_brand`].
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionQuery {
    pub window: Option<TimeWindow>,
    pub limit: usize,
}

impl Default for MentionQuery {
    fn default() -> Self {
        Self {
            window: None,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationFilter {
    All,
    Mention(Uuid),
    Mentions(Vec<Uuid>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CitationOrder {
    #[default]
    AuthorityDesc,
    NewestFirst,
}
