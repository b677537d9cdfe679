//! # Configuration Module
//!
//! This module defines the bot settings loaded from the environment,
//! including flow limits, AI provider recovery settings and storage paths.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;

// Constants for bot configuration
pub const DEFAULT_TOKENS: i64 = 10;
pub const DEFAULT_MIN_SLIDES: u32 = 1;
pub const DEFAULT_MAX_SLIDES: u32 = 30;
pub const DEFAULT_MIN_TOPIC_CHARS: usize = 3;
pub const DEFAULT_MAX_TOPIC_CHARS: usize = 200;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://bot.sqlite3";
pub const DEFAULT_TEMPLATES_DIR: &str = "assets";
pub const MIN_GENERATION_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODELS: &[&str] = &[
    "openai/gpt-4o-mini",
    "deepseek/deepseek-chat-v3-0324:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "openai/gpt-oss-120b:free",
];

/// Recovery configuration for the AI provider
#[derive(Debug, Clone)]
pub struct AiRecoveryConfig {
    /// Maximum number of models tried per generation
    pub max_model_attempts: u32,
    /// Base delay between attempts in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single provider request in seconds
    pub request_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for AiRecoveryConfig {
    fn default() -> Self {
        Self {
            max_model_attempts: 2,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            request_timeout_secs: 40,
            circuit_breaker_threshold: 3,
            circuit_breaker_reset_secs: 120,
        }
    }
}

/// AI provider settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key; empty means fallback-only mode
    pub api_key: String,
    /// Models tried in order
    pub models: Vec<String>,
    /// Chat completions base URL
    pub base_url: String,
    /// Retry and circuit breaker settings
    pub recovery: AiRecoveryConfig,
}

impl AiConfig {
    /// Whether an API key is configured
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            models: DEFAULT_OPENROUTER_MODELS.iter().map(|m| m.to_string()).collect(),
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            recovery: AiRecoveryConfig::default(),
        }
    }
}

/// Bounds applied to dialogue input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowLimits {
    pub min_slides: u32,
    pub max_slides: u32,
    pub min_topic_chars: usize,
    pub max_topic_chars: usize,
}

impl Default for FlowLimits {
    fn default() -> Self {
        Self {
            min_slides: DEFAULT_MIN_SLIDES,
            max_slides: DEFAULT_MAX_SLIDES,
            min_topic_chars: DEFAULT_MIN_TOPIC_CHARS,
            max_topic_chars: DEFAULT_MAX_TOPIC_CHARS,
        }
    }
}

/// Per-user message rate limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_messages: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 8,
            max_messages: 12,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Telegram id of the administrator, 0 when unset
    pub admin_id: i64,
    pub default_tokens: i64,
    pub database_url: String,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub generation_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
    pub limits: FlowLimits,
    pub rate_limit: RateLimitConfig,
    pub ai: AiConfig,
}

impl BotConfig {
    /// Load `.env` and read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let default_tokens = parse_int(&get, "DEFAULT_TOKENS", DEFAULT_TOKENS)?;
        if default_tokens < 0 {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_TOKENS",
                value: default_tokens.to_string(),
            });
        }

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => match get("DB_PATH") {
                Some(path) => format!("sqlite://{path}"),
                None => DEFAULT_DATABASE_URL.to_string(),
            },
        };

        let limits = FlowLimits {
            min_slides: parse_int(&get, "MIN_SLIDES", DEFAULT_MIN_SLIDES)?.max(1),
            max_slides: parse_int(&get, "MAX_SLIDES", DEFAULT_MAX_SLIDES)?,
            ..FlowLimits::default()
        };
        if limits.max_slides < limits.min_slides {
            return Err(ConfigError::Invalid {
                var: "MAX_SLIDES",
                value: limits.max_slides.to_string(),
            });
        }

        let models = get("OPENROUTER_MODELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| AiConfig::default().models);

        let recovery = AiRecoveryConfig {
            request_timeout_secs: parse_int(&get, "OPENROUTER_TIMEOUT_SEC", 40u64)?.max(10),
            max_model_attempts: parse_int(&get, "OPENROUTER_MAX_MODEL_ATTEMPTS", 2u32)?.max(1),
            ..AiRecoveryConfig::default()
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            bot_token,
            admin_id: parse_int(&get, "ADMIN_ID", 0i64)?,
            default_tokens,
            database_url,
            templates_dir: get("TEMPLATES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR)),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("presentations")),
            generation_timeout: Duration::from_secs(
                parse_int(&get, "GENERATION_TIMEOUT_SEC", 90u64)?.max(MIN_GENERATION_TIMEOUT_SECS),
            ),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).to_lowercase(),
            log_format,
            limits,
            rate_limit: RateLimitConfig {
                window_secs: parse_int(&get, "RATE_LIMIT_WINDOW_SEC", 8u64)?.max(1),
                max_messages: parse_int(&get, "RATE_LIMIT_MAX_MESSAGES", 12usize)?.max(2),
            },
            ai: AiConfig {
                api_key: get("OPENROUTER_API_KEY").unwrap_or_default(),
                models,
                base_url: get("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string()),
                recovery,
            },
        })
    }

    /// Whether the given Telegram user is the configured administrator
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id != 0 && self.admin_id == user_id
    }
}

fn parse_int<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
