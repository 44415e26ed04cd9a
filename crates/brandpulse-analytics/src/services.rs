use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use brandpulse_core::{AppConfig, MentionStore};

use crate::authority::{AuthorityScorer, AuthorityTable};
use crate::brand_health::{BrandHealthAggregator, BrandHealthSettings};
use crate::citations::CitationTracker;
use crate::error::AnalyticsError;
use crate::sentiment::{SentimentAnalyzer, SentimentLexicon};

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub cache_capacity: NonZeroUsize,
    pub sentiment_ttl: Duration,
    pub authority_ttl: Duration,
    pub health: BrandHealthSettings,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            cache_capacity: NonZeroUsize::MIN.saturating_add(9_999),
            sentiment_ttl: SentimentAnalyzer::DEFAULT_TTL,
            authority_ttl: AuthorityScorer::DEFAULT_TTL,
            health: BrandHealthSettings::default(),
        }
    }
}

impl AnalyticsSettings {
    /// # Errors
    ///
    /// Returns `INVALID_CACHE_CAPACITY` when `cache_max_entries` is zero.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AnalyticsError> {
        let cache_capacity = NonZeroUsize::new(config.cache_max_entries).ok_or_else(|| {
            AnalyticsError::validation(
                "INVALID_CACHE_CAPACITY",
                "cache capacity must be at least 1",
            )
        })?;
        Ok(Self {
            cache_capacity,
            sentiment_ttl: Duration::from_secs(config.sentiment_cache_ttl_secs),
            authority_ttl: Duration::from_secs(config.authority_cache_ttl_secs),
            health: BrandHealthSettings::from_app_config(config),
        })
    }
}

/// The scoring engine wired against one store.
#[derive(Clone)]
pub struct Analytics {
    pub store: Arc<dyn MentionStore>,
    pub sentiment: Arc<SentimentAnalyzer>,
    pub authority: Arc<AuthorityScorer>,
    pub citations: CitationTracker,
    pub health: Arc<BrandHealthAggregator>,
}

impl Analytics {
    pub fn new(store: Arc<dyn MentionStore>, settings: &AnalyticsSettings) -> Self {
        Self::with_tables(
            store,
            settings,
            SentimentLexicon::default(),
            AuthorityTable::default(),
        )
    }

    pub fn with_tables(
        store: Arc<dyn MentionStore>,
        settings: &AnalyticsSettings,
        lexicon: SentimentLexicon,
        table: AuthorityTable,
    ) -> Self {
        let sentiment = Arc::new(SentimentAnalyzer::new(
            lexicon,
            settings.cache_capacity,
            settings.sentiment_ttl,
        ));
        let authority = Arc::new(AuthorityScorer::new(
            table,
            settings.cache_capacity,
            settings.authority_ttl,
        ));
        let citations = CitationTracker::new(Arc::clone(&store), Arc::clone(&authority));
        let health = Arc::new(BrandHealthAggregator::new(
            Arc::clone(&store),
            citations.clone(),
            settings.health,
        ));

        Self {
            store,
            sentiment,
            authority,
            citations,
            health,
        }
    }
}
