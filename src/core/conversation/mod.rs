pub mod conversation_models;
pub mod conversation_router;
pub mod history_store;

pub use conversation_models::{
    ConversationKey, IncomingMessage, KeyPolicy, Role, Transcript, Turn,
};
pub use conversation_router::ConversationRouter;
pub use history_store::{HistoryError, HistoryStore};
