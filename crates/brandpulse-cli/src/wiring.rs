//! Builds the store, scoring engine and orchestrator from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use brandpulse_analytics::{
    Analytics, AnalyticsSettings, CompletionClientConfig, CompletionProvider, HttpCompletionClient,
    InMemoryStore,
};
use brandpulse_core::{AppConfig, MentionStore};
use brandpulse_runners::{standard_orchestrator, Orchestrator};
use sqlx::PgPool;

pub(crate) struct Services {
    pub(crate) config: Arc<AppConfig>,
    pub(crate) analytics: Analytics,
    pub(crate) orchestrator: Arc<Orchestrator>,
}

/// The configured Postgres store, or an in-memory store when no database URL is set.
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn MentionStore>> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; using in-memory store (nothing is persisted)");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    let pool = require_pool(config).await?;
    Ok(Arc::new(brandpulse_db::PgStore::new(pool)))
}

fn build_provider(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn CompletionProvider>>> {
    let Some(client_config) = CompletionClientConfig::from_app_config(config) else {
        tracing::debug!("no completion provider configured");
        return Ok(None);
    };
    let client =
        HttpCompletionClient::new(client_config).context("invalid completion provider settings")?;
    Ok(Some(Arc::new(client)))
}

pub(crate) async fn build_services(config: AppConfig) -> anyhow::Result<Services> {
    let config = Arc::new(config);
    let flags = brandpulse_core::load_flags_or_default(&config.flags_path).with_context(|| {
        format!(
            "failed to load feature flags from {}",
            config.flags_path.display()
        )
    })?;
    tracing::debug!(
        path = %config.flags_path.display(),
        flags = flags.len(),
        "feature flags loaded"
    );

    let store = build_store(&config).await?;
    let settings = AnalyticsSettings::from_app_config(&config)?;
    let analytics = Analytics::new(store, &settings);
    let provider = build_provider(&config)?;

    let orchestrator = Arc::new(standard_orchestrator(
        &analytics,
        provider,
        &Arc::new(flags),
        Duration::from_secs(config.runner_timeout_secs),
    ));

    Ok(Services {
        config,
        analytics,
        orchestrator,
    })
}

/// Connect to Postgres; fails when `DATABASE_URL` is not configured.
pub(crate) async fn require_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(brandpulse_db::DbError::MissingDatabaseUrl)?;
    brandpulse_db::connect_pool(url, brandpulse_db::PoolConfig::from_app_config(config))
        .await
        .context("failed to connect to database")
}
