// Process configuration, read once at startup and injected from there.
//
// Every setting comes from the environment (optionally seeded from a .env
// file by main). A missing API key is not an error here: the moderation
// service answers with a "needs_review" decision instead.

use crate::core::moderation::AgentConfig;
use thiserror::Error;

pub const DEFAULT_AGENT_URL: &str =
    "https://agent.timeweb.cloud/api/v1/cloud-ai/agents/6087a6cd-b070-4bcc-8b71-9aaed01c2168/v1";
pub const DEFAULT_PORT: u16 = 8085;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Token cap sent with every agent request.
pub const AGENT_MAX_TOKENS: u32 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid PORT value: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
    pub port: u16,
    pub agent: AgentConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            log_level: lookup("LOG_LEVEL")
                .map(|level| normalize_log_level(&level))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            port,
            agent: AgentConfig {
                url: lookup("TIMEWEB_AGENT_URL").unwrap_or_else(|| DEFAULT_AGENT_URL.to_string()),
                api_key: lookup("TIMEWEB_AGENT_API_KEY"),
                access_id: lookup("TIMEWEB_AGENT_ACCESS_ID"),
                max_tokens: AGENT_MAX_TOKENS,
            },
        })
    }
}

/// Turn a `LOG_LEVEL` value into an `EnvFilter` directive.
///
/// Accepts tracing level names plus the `WARNING`/`CRITICAL`/`FATAL` spellings
/// used by other services. A bare word that is neither falls back to the
/// default, since `EnvFilter` would read it as a target and silence everything.
/// Full directives (`moderation_agent=trace,info`) pass through unchanged.
fn normalize_log_level(raw: &str) -> String {
    let level = raw.trim().to_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => level,
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        directive if directive.contains('=') || directive.contains(',') => level,
        _ => DEFAULT_LOG_LEVEL.to_string(),
    }
}
