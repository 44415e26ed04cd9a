use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which mentions contribute citations to a brand-health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CitationScope {
    /// Fold citations across every fetched mention.
    #[default]
    AllMentions,
    /// Only the newest fetched mention's citations.
    FirstMention,
}

impl std::fmt::Display for CitationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CitationScope::AllMentions => write!(f, "all_mentions"),
            CitationScope::FirstMention => write!(f, "first_mention"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Postgres URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub flags_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub sentiment_cache_ttl_secs: u64,
    pub authority_cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub health_window_days: u32,
    pub health_mention_limit: usize,
    pub health_citation_scope: CitationScope,
    pub runner_timeout_secs: u64,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub llm_retry_backoff_base_ms: u64,
    pub health_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("flags_path", &self.flags_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("sentiment_cache_ttl_secs", &self.sentiment_cache_ttl_secs)
            .field("authority_cache_ttl_secs", &self.authority_cache_ttl_secs)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("health_window_days", &self.health_window_days)
            .field("health_mention_limit", &self.health_mention_limit)
            .field("health_citation_scope", &self.health_citation_scope)
            .field("runner_timeout_secs", &self.runner_timeout_secs)
            .field("llm_base_url", &self.llm_base_url)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("llm_retry_backoff_base_ms", &self.llm_retry_backoff_base_ms)
            .field("health_cron", &self.health_cron)
            .finish()
    }
}
