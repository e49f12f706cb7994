//! Provider adapters
//!
//! Each provider lives in its own module and implements one capability
//! trait from [`adapter`] per feature it supports. Adapters are pure
//! translators; the dispatcher owns every side effect.

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;

pub use adapter::{
    Capability, ChatAdapter, ChatCapabilities, EmbeddingAdapter, EmbeddingCapabilities, Endpoint,
    ProviderAdapter, RequestAuth, SpeechAdapter, SpeechCapabilities,
};
pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;

use crate::config::ProviderType;

/// Capabilities each provider implements
pub fn supported_capabilities(provider: ProviderType) -> &'static [Capability] {
    match provider {
        ProviderType::OpenAI => &[Capability::Chat, Capability::Embedding, Capability::Speech],
        ProviderType::Anthropic => &[Capability::Chat],
        ProviderType::Gemini => &[Capability::Chat, Capability::Embedding],
    }
}
