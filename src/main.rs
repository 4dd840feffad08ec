mod agent;
mod cli;
mod config;
mod conversation;
mod ingest;
mod llm;
mod normalize;
mod queries;
mod store;
mod tools;
mod types;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use agent::{Agent, AgentSettings};
use cli::{Cli, Command};
use config::AppConfig;
use llm::openai_responses::OpenAiResponsesProvider;
use llm::retry::RetryPolicy;
use llm::LlmProvider;
use store::sqlite::SqliteStore;
use store::HighlightStore;
use tools::create_default_router;

/// Create the reasoning-service provider based on config.
fn create_llm_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.llm.provider.as_str() {
        "openai" | "openai_responses" => {
            let provider = OpenAiResponsesProvider::new(
                config.api_key()?,
                config.llm.api_base.clone(),
                config.timeout(),
                RetryPolicy::from(&config.retry),
            )?;
            Ok(Arc::new(provider))
        }
        other => bail!("Unknown provider: '{}'. Supported: 'openai'", other),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "ipdo_agent=debug" } else { "ipdo_agent=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    if let Some(path) = &cli.config {
        return AppConfig::load_from(path);
    }
    // Auto-generate config file on first run
    let config_path = AppConfig::config_path()?;
    if !config_path.exists() {
        let path = AppConfig::save_default()?;
        tracing::info!(path = %path.display(), "created default config");
    }
    AppConfig::load()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let store = Arc::new(SqliteStore::open(&config.database.path).await?);
    tracing::info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        database = %config.database.path.display(),
        "configuration loaded"
    );

    match cli.command.unwrap_or(Command::Chat) {
        Command::Dates => {
            let dates = store.list_available_dates().await?;
            if dates.is_empty() {
                println!("Nenhuma data no banco.");
            }
            for date in dates {
                println!("{date}");
            }
        }
        Command::Import { files } => {
            let mut failures = 0;
            for path in &files {
                match ingest::import_file(&store, path).await {
                    Ok(summary) => println!(
                        "{}: {} ({} geração, {} térmica)",
                        path.display(),
                        summary.date,
                        summary.generation_rows,
                        summary.thermal_rows
                    ),
                    Err(err) => {
                        failures += 1;
                        eprintln!("{}: {err:#}", path.display());
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} of {} files failed to import", files.len());
            }
        }
        command => {
            let llm = create_llm_provider(&config)?;
            let settings = AgentSettings::from_config(&config).context("Invalid agent settings")?;
            let agent = Agent::new(llm, create_default_router(store), settings);
            match command {
                Command::Ask { question } => println!("{}", agent.answer(&question.join(" ")).await),
                _ => cli::run_chat_loop(&agent).await?,
            }
        }
    }

    Ok(())
}
