mod commands;
mod scheduler;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::AnalysisArgs;

#[derive(Debug, Parser)]
#[command(name = "brandpulse")]
#[command(about = "Brand mention, sentiment and authority analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the mention-analysis runner on one piece of text
    Analyze(AnalysisArgs),
    /// Run every enabled runner on one piece of text
    RunAll(AnalysisArgs),
    /// Print a brand-health summary
    Health {
        /// Brand id mentions are stored under
        #[arg(long)]
        brand_id: String,

        /// Trailing window in days (defaults to BRANDPULSE_HEALTH_WINDOW_DAYS)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Rank competitors from a JSON file of competitor mentions
    Competitive {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        total_responses: usize,

        /// Report this brand's relative market position
        #[arg(long)]
        brand: Option<String>,
    },
    /// Score a citation source's authority
    Authority { source: String },
    /// List registered runners and whether each is enabled
    Runners,
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Log brand-health summaries on BRANDPULSE_HEALTH_CRON until Ctrl-C
    Watch {
        /// Brand id to summarize (repeatable)
        #[arg(long = "brand-id", required = true)]
        brand_ids: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database connection
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = brandpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Db { command } => run_db(&config, &command).await,
        Commands::Competitive {
            file,
            total_responses,
            brand,
        } => commands::run_competitive(&file, total_responses, brand.as_deref()).await,
        Commands::Analyze(args) => {
            let services = wiring::build_services(config).await?;
            commands::run_analyze(&services, &args).await
        }
        Commands::RunAll(args) => {
            let services = wiring::build_services(config).await?;
            commands::run_all(&services, &args).await
        }
        Commands::Health { brand_id, days } => {
            let services = wiring::build_services(config).await?;
            commands::run_health(&services, &brand_id, days).await
        }
        Commands::Authority { source } => {
            let services = wiring::build_services(config).await?;
            commands::run_authority(&services, &source).await
        }
        Commands::Runners => {
            let services = wiring::build_services(config).await?;
            commands::run_list_runners(&services).await
        }
        Commands::Watch { brand_ids } => {
            let services = wiring::build_services(config).await?;
            run_watch(&services, brand_ids).await
        }
    }
}

async fn run_db(config: &brandpulse_core::AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    let pool = wiring::require_pool(config).await?;
    match command {
        DbCommands::Ping => {
            if let Err(e) = brandpulse_db::health_check(&pool).await {
                tracing::error!(error = %e, "database ping failed");
                return Err(e.into());
            }
            commands::print_json(&serde_json::json!({ "database": "ok" }))
        }
        DbCommands::Migrate => {
            let applied = brandpulse_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            commands::print_json(&serde_json::json!({ "applied": applied }))
        }
    }
}

async fn run_watch(services: &wiring::Services, brand_ids: Vec<String>) -> anyhow::Result<()> {
    let cron = services.config.health_cron.clone();
    let mut scheduler = scheduler::build_scheduler(
        &cron,
        std::sync::Arc::clone(&services.analytics.health),
        brand_ids,
    )
    .await?;
    tracing::info!(cron = %cron, "watching brand health");

    scheduler::shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}
