// Conversation router - decides whether and how the bot answers a message.
//
// This service handles:
// - Ignoring the bot's own messages
// - Eligibility (mentioned, or a direct message)
// - Picking the conversation key from the configured policy
// - Serialising work per conversation so replies never race on a transcript
// - Turning every failure into a user-facing message
//
// NO Discord dependencies here - the Discord layer hands us an
// `IncomingMessage` and sends whatever string we return.

use super::conversation_models::{ConversationKey, IncomingMessage, KeyPolicy};
use super::history_store::HistoryStore;
use crate::core::ai::{AiProvider, GenerateError, ResponseGenerator};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Reply for a mention that carries no text.
pub const GREETING: &str = "Hello! Mention me with a question, or send me a direct message.";

/// Reply when generation fails. Error details go to the log only.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error processing your request.";

pub const FORGET_CLEARED: &str = "Conversation history cleared!";
pub const FORGET_NOTHING: &str = "There was no conversation history to clear.";

pub struct ConversationRouter<P: AiProvider, S: HistoryStore> {
    bot_id: u64,
    generator: ResponseGenerator<P, S>,
    store: Arc<S>,
    policy: KeyPolicy,
    /// One lock per conversation; held for the whole read-generate-append cycle.
    locks: DashMap<ConversationKey, Arc<Mutex<()>>>,
}

impl<P: AiProvider, S: HistoryStore> ConversationRouter<P, S> {
    pub fn new(
        bot_id: u64,
        generator: ResponseGenerator<P, S>,
        store: Arc<S>,
        policy: KeyPolicy,
    ) -> Self {
        Self {
            bot_id,
            generator,
            store,
            policy,
            locks: DashMap::new(),
        }
    }

    /// Conversation key for a message from `author_id` in `channel_id`.
    pub fn key_for(&self, author_id: u64, channel_id: u64) -> ConversationKey {
        self.policy.key_for(author_id, channel_id)
    }

    /// Whether `message` is addressed to the bot at all: not the bot's own
    /// message, and either a mention or a direct message.
    pub fn should_respond(&self, message: &IncomingMessage) -> bool {
        message.author_id != self.bot_id && (message.mentions_bot || message.is_direct)
    }

    /// Returns the reply to send, or `None` when the bot should stay quiet.
    pub async fn handle_incoming(&self, message: &IncomingMessage) -> Option<String> {
        if !self.should_respond(message) {
            return None;
        }

        let text = message.content.trim();
        if text.is_empty() {
            return Some(GREETING.to_string());
        }

        let key = self.key_for(message.author_id, message.channel_id);
        Some(self.handle_prompt(&key, text).await)
    }

    /// Generates a reply to `text` within the conversation `key`.
    ///
    /// Never fails: errors are logged and replaced by [`FALLBACK_REPLY`].
    pub async fn handle_prompt(&self, key: &ConversationKey, text: &str) -> String {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let transcript = self.store.get_or_create(key).await;
        tracing::debug!(key = %key, turns = transcript.len(), "Loaded transcript");

        match self.generator.generate(key, &transcript, text).await {
            Ok(reply) => {
                tracing::info!(key = %key, chars = reply.len(), "Generated reply");
                reply
            }
            Err(GenerateError::Remote(e)) => {
                tracing::error!(key = %key, "AI error: {}", e);
                FALLBACK_REPLY.to_string()
            }
            Err(GenerateError::History(e)) => {
                tracing::error!(key = %key, "History error: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Drops the transcript for `key` and says whether there was one.
    pub async fn handle_forget(&self, key: &ConversationKey) -> &'static str {
        let cleared = {
            let lock = self.lock_for(key);
            let _guard = lock.lock().await;
            self.store.clear(key).await
        };

        // Only the map still holds the lock when nobody else is using the key
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);

        if cleared {
            tracing::info!(key = %key, "Conversation history cleared");
            FORGET_CLEARED
        } else {
            FORGET_NOTHING
        }
    }

    fn lock_for(&self, key: &ConversationKey) -> Arc<Mutex<()>> {
        // Clone the Arc out so the DashMap shard lock is released before awaiting.
        self.locks
            .entry(*key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::{AiConfig, AiProviderResponse, RemoteApiError};
    use crate::core::conversation::history_store::{SEED_MODEL_TURN, SEED_USER_TURN};
    use crate::core::conversation::{Transcript, Turn};
    use crate::infra::conversation::InMemoryHistoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const BOT_ID: u64 = 999;
    const CHANNEL: u64 = 10;
    const USER: u64 = 20;

    /// Replies with "reply N" and counts calls. Optionally fails or stalls.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl AiProvider for Arc<CountingProvider> {
        async fn chat_complete(
            &self,
            messages: &[Turn],
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, RemoteApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(RemoteApiError::Status {
                    status: 429,
                    message: "quota".to_string(),
                });
            }
            Ok(AiProviderResponse {
                content: format!("reply {} to {} turns", n, messages.len()),
                thinking: None,
            })
        }
    }

    struct Harness {
        router: ConversationRouter<Arc<CountingProvider>, InMemoryHistoryStore>,
        provider: Arc<CountingProvider>,
        store: Arc<InMemoryHistoryStore>,
    }

    fn harness_with(provider: CountingProvider, policy: KeyPolicy, timeout: Duration) -> Harness {
        let provider = Arc::new(provider);
        let store = Arc::new(InMemoryHistoryStore::new());
        let config = AiConfig {
            timeout,
            ..AiConfig::default()
        };
        let generator =
            ResponseGenerator::new(Arc::clone(&provider), Arc::clone(&store), config);
        let router = ConversationRouter::new(BOT_ID, generator, Arc::clone(&store), policy);
        Harness {
            router,
            provider,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(
            CountingProvider::default(),
            KeyPolicy::PerChannel,
            Duration::from_secs(30),
        )
    }

    fn guild_message(content: &str, mentions_bot: bool) -> IncomingMessage {
        IncomingMessage {
            author_id: USER,
            channel_id: CHANNEL,
            is_direct: false,
            mentions_bot,
            content: content.to_string(),
        }
    }

    fn direct_message(content: &str) -> IncomingMessage {
        IncomingMessage {
            is_direct: true,
            ..guild_message(content, false)
        }
    }

    #[tokio::test]
    async fn test_own_messages_never_get_a_reply() {
        let h = harness();
        for content in ["", "hello", "@bot hi"] {
            let msg = IncomingMessage {
                author_id: BOT_ID,
                mentions_bot: true,
                is_direct: true,
                ..guild_message(content, true)
            };
            assert_eq!(h.router.handle_incoming(&msg).await, None);
        }
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_guild_message_without_mention_is_ignored() {
        let h = harness();
        let reply = h.router.handle_incoming(&guild_message("hello", false)).await;
        assert_eq!(reply, None);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
        assert!(!h.store.clear(&ConversationKey::Channel(CHANNEL)).await);
    }

    #[tokio::test]
    async fn test_direct_message_is_answered_without_mention() {
        let h = harness();
        let reply = h.router.handle_incoming(&direct_message("hello")).await;
        assert!(reply.unwrap().starts_with("reply 1"));
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bare_mention_gets_greeting_without_generation() {
        let h = harness();
        let reply = h.router.handle_incoming(&guild_message("   ", true)).await;
        assert_eq!(reply.as_deref(), Some(GREETING));
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
        assert!(!h.store.clear(&ConversationKey::Channel(CHANNEL)).await);
    }

    #[tokio::test]
    async fn test_mention_appends_user_and_model_turns() {
        let h = harness();
        let key = ConversationKey::Channel(CHANNEL);
        let before = h.store.get_or_create(&key).await;

        let reply = h
            .router
            .handle_incoming(&guild_message("Summarize: The quick brown fox...", true))
            .await
            .unwrap();

        let after = h.store.get_or_create(&key).await;
        assert_eq!(after.len(), before.len() + 2);
        assert_eq!(
            after.turns()[after.len() - 2],
            Turn::user("Summarize: The quick brown fox...")
        );
        assert_eq!(after.turns()[after.len() - 1], Turn::model(reply));
    }

    #[tokio::test]
    async fn test_forget_then_message_starts_from_fresh_seed() {
        let h = harness();
        let key = h.router.key_for(USER, CHANNEL);
        h.router.handle_incoming(&guild_message("first", true)).await;

        assert_eq!(h.router.handle_forget(&key).await, FORGET_CLEARED);
        assert_eq!(h.router.handle_forget(&key).await, FORGET_NOTHING);

        h.router.handle_incoming(&guild_message("second", true)).await;
        let transcript = h.store.get_or_create(&key).await;
        let contents: Vec<&str> = transcript
            .turns()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents[0], SEED_USER_TURN);
        assert_eq!(contents[1], SEED_MODEL_TURN);
        assert_eq!(contents[2], "second");
        assert!(!contents.contains(&"first"));
    }

    #[tokio::test]
    async fn test_remote_failure_returns_fallback_and_keeps_transcript() {
        let h = harness_with(
            CountingProvider {
                fail: true,
                ..CountingProvider::default()
            },
            KeyPolicy::PerChannel,
            Duration::from_secs(30),
        );
        let key = ConversationKey::Channel(CHANNEL);
        let before = h.store.get_or_create(&key).await;

        let reply = h.router.handle_incoming(&guild_message("hi", true)).await;
        assert_eq!(reply.as_deref(), Some(FALLBACK_REPLY));
        assert_eq!(h.store.get_or_create(&key).await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_fallback_and_keeps_transcript() {
        let h = harness_with(
            CountingProvider {
                delay: Duration::from_secs(120),
                ..CountingProvider::default()
            },
            KeyPolicy::PerChannel,
            Duration::from_secs(30),
        );

        let reply = h.router.handle_incoming(&direct_message("hi")).await;
        assert_eq!(reply.as_deref(), Some(FALLBACK_REPLY));

        let transcript = h.store.get_or_create(&ConversationKey::Channel(CHANNEL)).await;
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_user_policy_keeps_users_apart_in_one_channel() {
        let h = harness_with(
            CountingProvider::default(),
            KeyPolicy::PerUser,
            Duration::from_secs(30),
        );
        let alice = IncomingMessage {
            author_id: 1,
            ..guild_message("from alice", true)
        };
        let bob = IncomingMessage {
            author_id: 2,
            ..guild_message("from bob", true)
        };

        h.router.handle_incoming(&alice).await;
        h.router.handle_incoming(&bob).await;

        let alice_transcript = h.store.get_or_create(&ConversationKey::User(1)).await;
        let bob_transcript = h.store.get_or_create(&ConversationKey::User(2)).await;
        assert_eq!(alice_transcript.turns()[2].content, "from alice");
        assert_eq!(bob_transcript.turns()[2].content, "from bob");
        assert!(!h.store.clear(&ConversationKey::Channel(CHANNEL)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_requests_are_serialised() {
        let h = Arc::new(harness_with(
            CountingProvider {
                delay: Duration::from_secs(1),
                ..CountingProvider::default()
            },
            KeyPolicy::PerChannel,
            Duration::from_secs(30),
        ));

        let first = {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                h.router.handle_incoming(&guild_message("one", true)).await
            })
        };
        let second = {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                h.router.handle_incoming(&guild_message("two", true)).await
            })
        };
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        // The later request saw the earlier exchange: 2 seed + 2 turns + its own input.
        let (seen_small, seen_large) = if first.starts_with("reply 1") {
            (first, second)
        } else {
            (second, first)
        };
        assert!(seen_small.ends_with("to 3 turns"));
        assert!(seen_large.ends_with("to 5 turns"));

        let transcript: Transcript = h
            .store
            .get_or_create(&ConversationKey::Channel(CHANNEL))
            .await;
        assert_eq!(transcript.len(), 6);
    }

    #[tokio::test]
    async fn test_forget_releases_conversation_locks() {
        let h = harness_with(
            CountingProvider::default(),
            KeyPolicy::PerUser,
            Duration::from_secs(30),
        );

        for user in 1..=100 {
            let key = h.router.key_for(user, CHANNEL);
            h.router.handle_prompt(&key, "hello").await;
            assert_eq!(h.router.handle_forget(&key).await, FORGET_CLEARED);
        }
        assert_eq!(h.router.locks.len(), 0);

        // Forgetting one conversation leaves the others' locks alone
        let kept = h.router.key_for(1, CHANNEL);
        let dropped = h.router.key_for(2, CHANNEL);
        h.router.handle_prompt(&kept, "hello").await;
        h.router.handle_prompt(&dropped, "hello").await;
        h.router.handle_forget(&dropped).await;
        assert_eq!(h.router.locks.len(), 1);
        assert!(h.router.locks.contains_key(&kept));
    }
}
