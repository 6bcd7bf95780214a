// Process configuration, read once at startup.
//
// The two secrets are required: without them the bot cannot do anything
// useful, so startup stops before touching the network. Everything else has
// a default.

use crate::core::ai::models::{DEFAULT_MODEL, DEFAULT_THINKING_BUDGET, DEFAULT_TIMEOUT};
use crate::core::ai::AiConfig;
use crate::core::conversation::history_store::DEFAULT_MAX_TURNS;
use crate::core::conversation::KeyPolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_COMMAND_PREFIX: &str = "/";
pub const DEFAULT_HEALTH_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing {0} environment variable! Add it to your environment or .env file.")]
    Missing(&'static str),

    #[error("Invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub gemini_api_key: String,
    pub ai: AiConfig,
    pub key_policy: KeyPolicy,
    pub max_turns: usize,
    pub command_prefix: String,
    /// `None` disables the health endpoint.
    pub health_port: Option<u16>,
}

impl BotConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token =
            get("DISCORD_TOKEN").ok_or(ConfigurationError::Missing("DISCORD_TOKEN"))?;
        let gemini_api_key =
            get("GEMINI_API_KEY").ok_or(ConfigurationError::Missing("GEMINI_API_KEY"))?;

        let timeout = match get("GEMINI_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(invalid(
                        "GEMINI_TIMEOUT_SECS",
                        v,
                        "expected a positive number of seconds",
                    ))
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        // `auto` leaves thinking to the model's own default
        let thinking_budget = match get("GEMINI_THINKING_BUDGET") {
            Some(v) if v.eq_ignore_ascii_case("auto") => None,
            Some(v) => match v.parse::<i32>() {
                Ok(n) if n >= -1 => Some(n),
                _ => {
                    return Err(invalid(
                        "GEMINI_THINKING_BUDGET",
                        v,
                        "expected `auto`, -1, 0 or a positive token count",
                    ))
                }
            },
            None => Some(DEFAULT_THINKING_BUDGET),
        };

        let ai = AiConfig {
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: get("GEMINI_SYSTEM_PROMPT"),
            timeout,
            thinking_budget,
            ..AiConfig::default()
        };

        let key_policy = match get("CONVERSATION_KEY_POLICY") {
            Some(v) => v
                .parse::<KeyPolicy>()
                .map_err(|reason| invalid("CONVERSATION_KEY_POLICY", v, reason))?,
            None => KeyPolicy::default(),
        };

        let max_turns = match get("CONVERSATION_MAX_TURNS") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(invalid(
                        "CONVERSATION_MAX_TURNS",
                        v,
                        "expected a positive integer",
                    ))
                }
            },
            None => DEFAULT_MAX_TURNS,
        };

        let health_port = match get("HEALTH_PORT") {
            Some(v) if v == "0" || v.eq_ignore_ascii_case("off") => None,
            Some(v) => Some(
                v.parse::<u16>()
                    .map_err(|e| invalid("HEALTH_PORT", v, e.to_string()))?,
            ),
            None => Some(DEFAULT_HEALTH_PORT),
        };

        Ok(Self {
            discord_token,
            gemini_api_key,
            ai,
            key_policy,
            max_turns,
            command_prefix: get("COMMAND_PREFIX")
                .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
            health_port,
        })
    }
}

fn invalid(var: &'static str, value: String, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        var,
        value,
        reason: reason.into(),
    }
}
