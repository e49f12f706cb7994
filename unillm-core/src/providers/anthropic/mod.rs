//! Anthropic provider implementation
//!
//! System messages are lifted into the top-level `system` field and function
//! results travel as `tool_result` blocks inside user turns.

pub mod converter;
mod provider;
mod streaming;
pub mod types;

pub use converter::DEFAULT_MAX_TOKENS;
pub use provider::{AnthropicProvider, DEFAULT_API_VERSION, MAX_INLINE_BYTES};
pub use types::{AnthropicRequest, AnthropicResponse, AnthropicStreamEvent};
