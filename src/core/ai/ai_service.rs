use super::models::{AiConfig, AiProviderResponse, RemoteApiError};
use crate::core::conversation::{
    ConversationKey, HistoryError, HistoryStore, Role, Transcript, Turn,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends the conversation to the provider and returns the next model turn.
    ///
    /// `messages` is in chronological order and ends with the new user input.
    async fn chat_complete(
        &self,
        messages: &[Turn],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, RemoteApiError>;
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Remote(#[from] RemoteApiError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Produces the next reply for a conversation and records the exchange.
///
/// The generator never picks conversation keys; the router hands it the key
/// together with the transcript it already fetched.
pub struct ResponseGenerator<P: AiProvider, S: HistoryStore> {
    provider: P,
    store: Arc<S>,
    config: AiConfig,
}

impl<P: AiProvider, S: HistoryStore> ResponseGenerator<P, S> {
    pub fn new(provider: P, store: Arc<S>, config: AiConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Asks the provider for a reply to `new_input` given `transcript`.
    ///
    /// On success the user turn and the model turn are appended to the
    /// stored transcript, in that order. On failure nothing is recorded.
    pub async fn generate(
        &self,
        key: &ConversationKey,
        transcript: &Transcript,
        new_input: &str,
    ) -> Result<String, GenerateError> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.extend_from_slice(transcript.turns());
        messages.push(Turn::user(new_input));

        tracing::debug!(
            key = %key,
            turns = messages.len(),
            model = %self.config.model,
            "Requesting reply"
        );

        let response = tokio::time::timeout(
            self.config.timeout,
            self.provider.chat_complete(&messages, &self.config),
        )
        .await
        .map_err(|_| RemoteApiError::Timeout(self.config.timeout))??;

        let reply = response.content.trim().to_string();
        if reply.is_empty() {
            return Err(RemoteApiError::Malformed("reply contained no text".to_string()).into());
        }

        if let Some(thinking) = &response.thinking {
            tracing::debug!(key = %key, chars = thinking.len(), "Model returned thinking");
        }

        self.store.append(key, Role::User, new_input).await?;
        self.store.append(key, Role::Model, &reply).await?;

        Ok(reply)
    }
}
