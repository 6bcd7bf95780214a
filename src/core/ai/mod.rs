pub mod ai_service;
pub mod models;

pub use ai_service::{AiProvider, GenerateError, ResponseGenerator};
pub use models::{AiConfig, AiProviderResponse, RemoteApiError};
