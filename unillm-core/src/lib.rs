//! Unillm Core Library
//!
//! A vendor-neutral normalization layer for LLM providers. Callers build
//! requests in the universal model ([`protocol`]); an adapter per provider
//! translates them to the vendor's native shape and back, and a dispatcher
//! drives each call through validation, conversion and transport.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod middleware;
pub mod protocol;
pub mod providers;
pub mod service;
pub mod stream;

pub use dispatch::{
    ChatCompletion, ChatDispatcher, ChatStream, EmbeddingDispatcher, EmbeddingGeneration,
    SpeechDispatcher, SpeechSynthesis,
};
pub use error::{ErrorKind, LlmError, LlmResult};
pub use service::{LlmService, LlmServiceBuilder};
pub use stream::StreamReconstructor;

/// Returns the version of the Unillm Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
