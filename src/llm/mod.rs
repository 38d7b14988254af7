//! LLM provider abstraction layer.
//!
//! This module provides a trait-based abstraction for completion providers,
//! allowing the playlist pipeline to work with different backends.

pub mod json;
mod openai;
mod provider;
mod types;

pub use openai::{ApiKeySource, OpenAIProvider};
pub use provider::{CompletionOptions, DisabledProvider, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, TokenUsage};
