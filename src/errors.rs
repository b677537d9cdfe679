//! # Error Types Module
//!
//! This module defines the error types used throughout the presentation flow.
//! User-facing dialogue errors are kept apart from collaborator errors so the
//! bot layer can decide which ones to show and which ones to recover from.

/// Errors signalled by the conversation flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Template input is not a known template id
    InvalidTemplate,
    /// Slide count is not an integer within the configured bounds
    InvalidCount,
    /// Topic is empty, too short or too long
    InvalidTopic,
    /// Input does not fit the current dialogue step
    UnexpectedInput,
    /// Not enough tokens left to generate a presentation
    InsufficientQuota { balance: i64 },
    /// The presentation file could not be assembled
    BuildFailed(String),
    /// The token storage could not be reached
    Storage(String),
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::InvalidTemplate => write!(f, "Invalid template"),
            FlowError::InvalidCount => write!(f, "Invalid slide count"),
            FlowError::InvalidTopic => write!(f, "Invalid topic"),
            FlowError::UnexpectedInput => write!(f, "Unexpected input"),
            FlowError::InsufficientQuota { balance } => {
                write!(f, "Insufficient quota: balance {balance}")
            }
            FlowError::BuildFailed(msg) => write!(f, "Build failed: {msg}"),
            FlowError::Storage(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for FlowError {}

/// Errors returned by the quota store
#[derive(Debug)]
pub enum QuotaError {
    /// Balance is lower than the requested amount
    Insufficient { balance: i64 },
    /// Amount or balance value is out of range
    InvalidAmount(i64),
    /// Database errors
    Storage(sqlx::Error),
}

impl std::fmt::Display for QuotaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaError::Insufficient { balance } => {
                write!(f, "Insufficient tokens: balance {balance}")
            }
            QuotaError::InvalidAmount(value) => write!(f, "Invalid token amount: {value}"),
            QuotaError::Storage(e) => write!(f, "Quota storage error: {e}"),
        }
    }
}

impl std::error::Error for QuotaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuotaError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for QuotaError {
    fn from(err: sqlx::Error) -> Self {
        QuotaError::Storage(err)
    }
}

impl From<QuotaError> for FlowError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::Insufficient { balance } => FlowError::InsufficientQuota { balance },
            other => FlowError::Storage(other.to_string()),
        }
    }
}

/// Errors from the AI text provider. All of them are recovered with fallback content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// No API key configured
    MissingCredential,
    /// Circuit breaker is open after repeated failures
    CircuitOpen,
    /// Provider did not answer in time
    Timeout(String),
    /// Transport or HTTP status errors
    Http(String),
    /// Response could not be turned into slides
    InvalidResponse(String),
}

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiError::MissingCredential => write!(f, "AI provider unavailable: no API key"),
            AiError::CircuitOpen => write!(f, "AI provider unavailable: circuit open"),
            AiError::Timeout(msg) => write!(f, "AI provider timeout: {msg}"),
            AiError::Http(msg) => write!(f, "AI provider HTTP error: {msg}"),
            AiError::InvalidResponse(msg) => write!(f, "AI provider invalid response: {msg}"),
        }
    }
}

impl std::error::Error for AiError {}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Timeout(err.to_string())
        } else {
            AiError::Http(err.to_string())
        }
    }
}

/// Errors from the presentation file builder
#[derive(Debug)]
pub enum BuildError {
    /// Filesystem errors
    Io(std::io::Error),
    /// Zip container errors
    Zip(zip::result::ZipError),
    /// Template asset cannot be embedded
    UnsupportedTemplate(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Io(e) => write!(f, "I/O error: {e}"),
            BuildError::Zip(e) => write!(f, "Zip error: {e}"),
            BuildError::UnsupportedTemplate(msg) => write!(f, "Unsupported template: {msg}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        BuildError::Io(err)
    }
}

impl From<zip::result::ZipError> for BuildError {
    fn from(err: zip::result::ZipError) -> Self {
        BuildError::Zip(err)
    }
}

/// Startup configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is not set
    Missing(&'static str),
    /// Variable is set but cannot be parsed
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{var} must be set"),
            ConfigError::Invalid { var, value } => {
                write!(f, "{var} has an invalid value: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_display() {
        assert_eq!(FlowError::InvalidCount.to_string(), "Invalid slide count");
        assert_eq!(
            FlowError::InsufficientQuota { balance: 0 }.to_string(),
            "Insufficient quota: balance 0"
        );
        assert_eq!(
            FlowError::BuildFailed("disk full".to_string()).to_string(),
            "Build failed: disk full"
        );
    }

    #[test]
    fn test_quota_error_converts_to_flow_error() {
        let flow: FlowError = QuotaError::Insufficient { balance: 2 }.into();
        assert_eq!(flow, FlowError::InsufficientQuota { balance: 2 });

        let flow: FlowError = QuotaError::InvalidAmount(-1).into();
        assert!(matches!(flow, FlowError::Storage(_)));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::Missing("BOT_TOKEN").to_string(),
            "BOT_TOKEN must be set"
        );
        let err = ConfigError::Invalid {
            var: "ADMIN_ID",
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("ADMIN_ID"));
    }
}
