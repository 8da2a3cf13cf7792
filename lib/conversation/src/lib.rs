//! Conversation helpers for the lamla AI gateway.
//!
//! This crate provides:
//!
//! - **History**: conversation turns as stored by the application
//! - **Context Window**: the bounded, chronological slice used in prompts
//! - **Prompt**: transcript and document assembly
//! - **Delivery**: chunked hand-out of a finished answer

pub mod delivery;
pub mod message;
pub mod prompt;
pub mod window;

pub use delivery::{chunk_stream, chunks};
pub use message::{HistoryEntry, Role};
pub use prompt::{ConversationPrompt, DEFAULT_SYSTEM_PROMPT};
pub use window::{ContextWindow, HistoryOrder, context_window};
