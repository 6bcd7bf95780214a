// Domain models for conversations.
//
// Plain data only: ids are primitive u64s so nothing here depends on
// serenity. The Discord layer converts its own types into these.

use std::fmt;
use std::str::FromStr;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role name as Gemini spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A single message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Ordered turns forming the context of one conversation.
///
/// Role alternation is not enforced: two user turns in a row are fine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a turn, then drops the oldest turns until at most
    /// `max_turns` remain.
    pub fn push_bounded(&mut self, turn: Turn, max_turns: usize) {
        self.turns.push(turn);
        if self.turns.len() > max_turns {
            let excess = self.turns.len() - max_turns;
            self.turns.drain(..excess);
        }
    }
}

/// Identifies one independent conversation.
///
/// The variant records which policy produced the key, so channel 42 and
/// user 42 never share a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationKey {
    Channel(u64),
    User(u64),
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationKey::Channel(id) => write!(f, "channel:{}", id),
            ConversationKey::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// How conversations are partitioned. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Everyone in a channel shares one transcript.
    #[default]
    PerChannel,
    /// Each user has a private transcript that follows them across channels.
    PerUser,
}

impl KeyPolicy {
    pub fn key_for(&self, author_id: u64, channel_id: u64) -> ConversationKey {
        match self {
            KeyPolicy::PerChannel => ConversationKey::Channel(channel_id),
            KeyPolicy::PerUser => ConversationKey::User(author_id),
        }
    }
}

impl FromStr for KeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "channel" => Ok(KeyPolicy::PerChannel),
            "user" => Ok(KeyPolicy::PerUser),
            other => Err(format!("expected `channel` or `user`, got `{}`", other)),
        }
    }
}

/// The router's view of an inbound chat message.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub author_id: u64,
    pub channel_id: u64,
    /// True for one-to-one (DM) channels.
    pub is_direct: bool,
    pub mentions_bot: bool,
    /// Message text with any mention of the bot removed.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_bounded_evicts_oldest_first() {
        let mut transcript = Transcript::default();
        for i in 0..5 {
            transcript.push_bounded(Turn::user(format!("m{}", i)), 3);
        }

        let contents: Vec<&str> = transcript
            .turns()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_push_bounded_allows_same_role_in_a_row() {
        let mut transcript = Transcript::default();
        transcript.push_bounded(Turn::user("a"), 10);
        transcript.push_bounded(Turn::user("b"), 10);
        assert_eq!(transcript.len(), 2);
        assert!(transcript.turns().iter().all(|t| t.role == Role::User));
    }

    #[test]
    fn test_key_policy_parsing() {
        assert_eq!("channel".parse::<KeyPolicy>(), Ok(KeyPolicy::PerChannel));
        assert_eq!(" User ".parse::<KeyPolicy>(), Ok(KeyPolicy::PerUser));
        assert!("guild".parse::<KeyPolicy>().is_err());
    }

    #[test]
    fn test_keys_from_different_policies_never_collide() {
        let by_channel = KeyPolicy::PerChannel.key_for(42, 42);
        let by_user = KeyPolicy::PerUser.key_for(42, 42);
        assert_ne!(by_channel, by_user);
        assert_eq!(by_channel.to_string(), "channel:42");
        assert_eq!(by_user.to_string(), "user:42");
    }
}
