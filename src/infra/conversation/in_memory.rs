// In-memory implementation of HistoryStore.
//
// Transcripts live only as long as the process. That matches what the bot
// needs today; a persistent store would implement the same trait.

use crate::core::conversation::history_store::{default_seed, DEFAULT_MAX_TURNS};
use crate::core::conversation::{
    ConversationKey, HistoryError, HistoryStore, Role, Transcript, Turn,
};
use async_trait::async_trait;
use dashmap::DashMap;

/// **DashMap:**
/// A concurrent HashMap that's safe to share across async tasks without a
/// Mutex. Different conversation keys land on independent entries, so
/// messages in different channels never block each other here.
pub struct InMemoryHistoryStore {
    data: DashMap<ConversationKey, Transcript>,
    max_turns: usize,
    seed: Vec<Turn>,
}

impl InMemoryHistoryStore {
    /// Store with the default bound and greeting seed.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_MAX_TURNS, default_seed())
    }

    /// Store keeping at most `max_turns` turns per conversation, seeding new
    /// conversations with `seed`. A bound of 0 is treated as 1.
    pub fn with_settings(max_turns: usize, seed: Vec<Turn>) -> Self {
        Self {
            data: DashMap::new(),
            max_turns: max_turns.max(1),
            seed,
        }
    }

    fn seeded_transcript(&self) -> Transcript {
        let mut transcript = Transcript::default();
        for turn in &self.seed {
            transcript.push_bounded(turn.clone(), self.max_turns);
        }
        transcript
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get_or_create(&self, key: &ConversationKey) -> Transcript {
        // entry() creates and reads under one shard lock, so two callers
        // can't both seed the same key
        self.data
            .entry(*key)
            .or_insert_with(|| {
                let transcript = self.seeded_transcript();
                tracing::debug!(
                    key = %key,
                    seeded = !transcript.is_empty(),
                    "Starting new conversation"
                );
                transcript
            })
            .clone()
    }

    async fn append(
        &self,
        key: &ConversationKey,
        role: Role,
        content: &str,
    ) -> Result<(), HistoryError> {
        let mut transcript = self
            .data
            .get_mut(key)
            .ok_or(HistoryError::MissingTranscript(*key))?;

        transcript.push_bounded(
            Turn {
                role,
                content: content.to_string(),
            },
            self.max_turns,
        );

        Ok(())
    }

    async fn clear(&self, key: &ConversationKey) -> bool {
        self.data.remove(key).is_some()
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
