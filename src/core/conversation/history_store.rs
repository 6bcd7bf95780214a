// The storage port for conversation transcripts.
//
// Core defines WHAT it needs from storage; `infra` provides the HOW
// (currently an in-memory DashMap). Swapping in a persistent backend or a
// test double only means implementing this trait.

use super::conversation_models::{ConversationKey, Role, Transcript, Turn};
use async_trait::async_trait;
use thiserror::Error;

/// Greeting turns every fresh transcript starts with.
pub const SEED_USER_TURN: &str = "Hi!";
pub const SEED_MODEL_TURN: &str = "Hello! I am your Discord AI bot powered by Gemini.";

/// Maximum number of turns kept per conversation unless configured otherwise.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// The default seed exchange.
pub fn default_seed() -> Vec<Turn> {
    vec![Turn::user(SEED_USER_TURN), Turn::model(SEED_MODEL_TURN)]
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("No transcript exists for {0}; call get_or_create first")]
    MissingTranscript(ConversationKey),
}

/// Process-wide mapping from conversation key to transcript.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns a snapshot of the transcript for `key`, creating a seeded one
    /// if none exists.
    async fn get_or_create(&self, key: &ConversationKey) -> Transcript;

    /// Appends a turn and evicts the oldest turns beyond the store's bound.
    /// The transcript must already exist.
    async fn append(
        &self,
        key: &ConversationKey,
        role: Role,
        content: &str,
    ) -> Result<(), HistoryError>;

    /// Removes the transcript for `key`. Returns whether one existed.
    async fn clear(&self, key: &ConversationKey) -> bool;
}
