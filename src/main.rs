use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use presentations::bot::{self, AppState, Command};
use presentations::config::{BotConfig, LogFormat};
use presentations::db;
use presentations::generation::openrouter::OpenRouterClient;
use presentations::generation::pptx::PptxBuilder;
use presentations::generation::Orchestrator;
use presentations::localization::init_localization;
use presentations::preferences::PreferenceStore;
use presentations::quota::QuotaStore;
use presentations::rate_limit::RateLimiter;
use presentations::session_store::SessionStore;
use presentations::templates::TemplateCatalog;

fn init_tracing(config: &BotConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("presentations={0},{0}", config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors are fatal before anything connects
    let config = BotConfig::from_env().context("Invalid configuration")?;
    init_tracing(&config);

    info!("Starting Presentation Telegram Bot");

    init_localization()?;

    let pool = db::connect(&config.database_url).await?;
    db::init_database_schema(&pool).await?;
    let preferences = PreferenceStore::new(pool.clone());
    let quota = QuotaStore::new(pool, config.default_tokens);

    let templates = Arc::new(
        TemplateCatalog::scan(&config.templates_dir).with_context(|| {
            format!("Failed to scan templates in {}", config.templates_dir.display())
        })?,
    );
    if templates.is_empty() {
        warn!(templates_dir = %config.templates_dir.display(), "No templates found");
    }

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let mut orchestrator = Orchestrator::new(
        quota.clone(),
        templates,
        Arc::new(PptxBuilder::new(config.output_dir.clone())),
        config.generation_timeout,
    );
    if config.ai.is_enabled() {
        info!(models = ?config.ai.models, "AI text generation enabled");
        orchestrator = orchestrator.with_generator(Arc::new(OpenRouterClient::new(config.ai.clone())?));
    } else {
        warn!("OPENROUTER_API_KEY is empty, using fallback slide texts only");
    }

    let state = AppState {
        sessions: Arc::new(SessionStore::new(Arc::new(orchestrator), config.limits.clone())),
        quota,
        preferences,
        rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit, config.admin_id)),
        config: Arc::new(config.clone()),
    };

    let bot = Bot::new(config.bot_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
