use crate::app_config::{AppConfig, CitationScope, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("BRANDPULSE_ENV", "development"))?;
    let log_level = or_default("BRANDPULSE_LOG_LEVEL", "info");
    let flags_path = PathBuf::from(or_default(
        "BRANDPULSE_FLAGS_PATH",
        "./config/features.yaml",
    ));

    let db_max_connections = parse_u32("BRANDPULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BRANDPULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BRANDPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let sentiment_cache_ttl_secs = parse_u64("BRANDPULSE_SENTIMENT_CACHE_TTL_SECS", "3600")?;
    let authority_cache_ttl_secs = parse_u64("BRANDPULSE_AUTHORITY_CACHE_TTL_SECS", "86400")?;
    let cache_max_entries = parse_usize("BRANDPULSE_CACHE_MAX_ENTRIES", "10000")?;
    if cache_max_entries == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BRANDPULSE_CACHE_MAX_ENTRIES".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    let health_window_days = parse_u32("BRANDPULSE_HEALTH_WINDOW_DAYS", "30")?;
    let health_mention_limit = parse_usize("BRANDPULSE_HEALTH_MENTION_LIMIT", "100")?;
    let health_citation_scope = parse_citation_scope(&or_default(
        "BRANDPULSE_HEALTH_CITATION_SCOPE",
        "all_mentions",
    ))?;
    let runner_timeout_secs = parse_u64("BRANDPULSE_RUNNER_TIMEOUT_SECS", "30")?;

    let llm_base_url = optional("BRANDPULSE_LLM_BASE_URL");
    let llm_api_key = optional("BRANDPULSE_LLM_API_KEY");
    let llm_model = or_default("BRANDPULSE_LLM_MODEL", "gpt-4o-mini");
    let llm_timeout_secs = parse_u64("BRANDPULSE_LLM_TIMEOUT_SECS", "60")?;
    let llm_max_retries = parse_u32("BRANDPULSE_LLM_MAX_RETRIES", "3")?;
    let llm_retry_backoff_base_ms = parse_u64("BRANDPULSE_LLM_RETRY_BACKOFF_BASE_MS", "1000")?;

    let health_cron = or_default("BRANDPULSE_HEALTH_CRON", "0 0 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        flags_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        sentiment_cache_ttl_secs,
        authority_cache_ttl_secs,
        cache_max_entries,
        health_window_days,
        health_mention_limit,
        health_citation_scope,
        runner_timeout_secs,
        llm_base_url,
        llm_api_key,
        llm_model,
        llm_timeout_secs,
        llm_max_retries,
        llm_retry_backoff_base_ms,
        health_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDPULSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_citation_scope(s: &str) -> Result<CitationScope, ConfigError> {
    match s {
        "all_mentions" => Ok(CitationScope::AllMentions),
        "first_mention" => Ok(CitationScope::FirstMention),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRANDPULSE_HEALTH_CITATION_SCOPE".to_string(),
            reason: format!("expected all_mentions or first_mention, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
