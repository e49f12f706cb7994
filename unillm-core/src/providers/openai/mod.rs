//! OpenAI provider implementation
//!
//! Translates between the universal model and the OpenAI chat completions,
//! embeddings and audio speech APIs. Function calling uses the `tools`
//! shape exclusively; the legacy `functions` field is only read back from
//! responses.

pub mod converter;
mod embeddings;
mod provider;
mod speech;
mod streaming;
pub mod types;

pub use provider::{OpenAIProvider, EMBEDDING_DIMENSIONS};
pub use speech::voice_name;
pub use types::{OpenAIRequest, OpenAIResponse, OpenAIStreamChunk};
