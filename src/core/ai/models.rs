use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Thinking off, so the whole output budget goes to the answer.
pub const DEFAULT_THINKING_BUDGET: i32 = 0;

/// Fixed generation settings. Set once at startup, never changed by users.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Optional system instruction sent alongside every request.
    pub system_prompt: Option<String>,
    /// Upper bound on a single provider call.
    pub timeout: Duration,
    /// Thinking tokens for models that reason before answering. `0` turns
    /// thinking off, `-1` lets the model decide, `None` sends nothing.
    pub thinking_budget: Option<i32>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            system_prompt: None,
            timeout: DEFAULT_TIMEOUT,
            thinking_budget: Some(DEFAULT_THINKING_BUDGET),
        }
    }
}

/// Response from an AI provider, containing the reply and optional thinking.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResponse {
    /// The reply text shown to the user.
    pub content: String,

    /// Reasoning the model emitted separately from its answer, if any.
    /// Only logged; never sent to Discord.
    pub thinking: Option<String>,
}

/// Everything that can go wrong talking to the generative API.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}
