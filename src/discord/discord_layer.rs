// Discord layer - commands and event handlers.
//
// Everything here translates between serenity/poise types and the core's
// primitive types. No conversation policy lives in this layer.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "conversation/message_handler.rs"]
pub mod message_handler;

use crate::core::conversation::ConversationRouter;
use crate::infra::ai::GeminiClient;
use crate::infra::conversation::InMemoryHistoryStore;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands and event handlers.
pub struct Data {
    pub conversations: Arc<ConversationRouter<GeminiClient, InMemoryHistoryStore>>,
}
