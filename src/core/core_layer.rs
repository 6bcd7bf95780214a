// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "conversation/mod.rs"]
pub mod conversation;
