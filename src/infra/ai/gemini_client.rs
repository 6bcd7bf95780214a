// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implementation of the `AiProvider` trait that talks to Google's Gemini API
// (https://ai.google.dev/gemini-api/docs).
//
// **Wire format:**
// - Authentication: API key in the `x-goog-api-key` header (kept out of the
//   URL so it never shows up in logged request lines).
// - Request: `contents[]` with nested `parts`; the system instruction is a
//   separate top-level field, not a turn.
// - Response: reply text is at `candidates[0].content.parts[*].text`. Parts
//   flagged `thought: true` are the model's reasoning, not the answer.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - Model name, e.g. `gemini-2.5-flash`

use crate::core::ai::{AiConfig, AiProvider, AiProviderResponse, RemoteApiError};
use crate::core::conversation::Turn;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// See: https://ai.google.dev/api/generate-content

/// A single part of content. Gemini uses a "parts" array to support
/// multimodal content; we only ever send and read text.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Set by thinking models on parts that carry reasoning.
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

/// One message in the conversation, in Gemini's shape.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// "user" or "model". Omitted for the system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

/// Generation configuration options that control the model's output.
/// See: https://ai.google.dev/api/generate-content#generationconfig
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    /// Controls randomness. Range: [0.0, 2.0]. Higher = more creative.
    temperature: f32,

    /// Maximum number of tokens to generate in the response. On 2.5+
    /// models thinking tokens are counted against this too.
    max_output_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

/// Thinking settings for Gemini 2.5+ models.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,

    /// 0 disables thinking, -1 lets the model pick.
    thinking_budget: i32,
}

/// The request body sent to the generateContent endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    generation_config: GenerationConfig,
}

/// A candidate response from the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Missing when the candidate was blocked.
    #[serde(default)]
    content: Option<Content>,

    /// Why the model stopped generating (e.g., "STOP", "MAX_TOKENS", "SAFETY").
    finish_reason: Option<String>,
}

/// Set when the prompt itself was rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// The response from the generateContent endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    /// List of candidate responses. Usually just one.
    candidates: Option<Vec<Candidate>>,

    prompt_feedback: Option<PromptFeedback>,
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Client for Google's Gemini API.
///
/// # Example
/// ```ignore
/// let client = GeminiClient::new(std::env::var("GEMINI_API_KEY")?);
/// let reply = client.chat_complete(&[Turn::user("Hello!")], &AiConfig::default()).await?;
/// ```
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn text_part(text: &str) -> Part {
        Part {
            text: Some(text.to_string()),
            thought: None,
        }
    }

    fn convert_turn(turn: &Turn) -> Content {
        Content {
            role: Some(turn.role.as_str().to_string()),
            parts: vec![Self::text_part(&turn.content)],
        }
    }

    fn build_request(messages: &[Turn], config: &AiConfig) -> GenerateContentRequest {
        let system_instruction = config
            .system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
            .map(|prompt| Content {
                role: None,
                parts: vec![Self::text_part(prompt)],
            });

        // Older models reject thinkingConfig outright
        let supports_thinking = config.model.contains("2.5") || config.model.contains("gemini-3");
        let thinking_config = config
            .thinking_budget
            .filter(|_| supports_thinking)
            .map(|budget| ThinkingConfig {
                include_thoughts: budget != 0,
                thinking_budget: budget,
            });

        GenerateContentRequest {
            contents: messages.iter().map(Self::convert_turn).collect(),
            system_instruction,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                thinking_config,
            },
        }
    }

    /// Pulls the answer (and any thinking) out of the first candidate.
    fn extract_reply(
        response: GenerateContentResponse,
    ) -> Result<AiProviderResponse, RemoteApiError> {
        let candidate = match response.candidates.and_then(|c| c.into_iter().next()) {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(RemoteApiError::Malformed(format!(
                    "No content in Gemini response ({})",
                    reason
                )));
            }
        };

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let mut answer = Vec::new();
        let mut thinking = Vec::new();
        for part in parts {
            let Some(text) = part.text else { continue };
            if part.thought.unwrap_or(false) {
                thinking.push(text);
            } else {
                answer.push(text);
            }
        }

        if answer.is_empty() {
            return Err(RemoteApiError::Malformed(format!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(AiProviderResponse {
            content: answer.concat(),
            thinking: if thinking.is_empty() {
                None
            } else {
                Some(thinking.join("\n\n"))
            },
        })
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        messages: &[Turn],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, RemoteApiError> {
        let url = format!("{}/models/{}:generateContent", API_BASE, config.model);
        let request = Self::build_request(messages, config);

        // Log request for debugging (never the API key!)
        tracing::debug!(
            "Gemini request to model {}: {} messages",
            config.model,
            request.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            // Try to parse as Gemini error response for better error messages
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RemoteApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteApiError::Malformed(e.to_string()))?;
        let reply = Self::extract_reply(parsed)?;

        tracing::debug!(
            "Gemini response received: {} chars content, {} chars thinking",
            reply.content.len(),
            reply.thinking.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        Ok(reply)
    }
}

// =============================================================================
// TESTS
// =============================================================================
