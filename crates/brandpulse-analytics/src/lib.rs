//! Brand analytics scoring engine.
//!
//! Sentiment and authority scoring behind a TTL cache, brand-mention
//! prominence, citation tracking, competitive ranking and brand-health
//! roll-ups over a [`brandpulse_core::MentionStore`].

pub mod authority;
pub mod brand_health;
pub mod cache;
pub mod citations;
pub mod competitive;
pub mod error;
pub mod llm;
pub mod memory;
pub mod prominence;
pub mod sentiment;
pub mod services;

mod retry;

pub use authority::{compute_authority, normalize_domain, AuthorityScorer, AuthorityTable};
pub use brand_health::{BrandHealth, BrandHealthAggregator, BrandHealthSettings};
pub use cache::{cache_key, TtlCache};
pub use citations::{CitationTracker, DEFAULT_TOP_CITATIONS};
pub use competitive::{
    aggregate, composite_score, rank, relative_position, CompetitorMention, CompetitorStat,
    RankedCompetitor,
};
pub use error::AnalyticsError;
pub use llm::{
    CompletionClientConfig, CompletionError, CompletionOptions, CompletionProvider,
    HttpCompletionClient,
};
pub use memory::InMemoryStore;
pub use prominence::{detect_mentions, prominence_score, MentionScan};
pub use sentiment::{AspectSentiment, SentimentAnalyzer, SentimentLexicon, SentimentResult};
pub use services::{Analytics, AnalyticsSettings};
