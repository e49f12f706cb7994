//! Google Gemini provider implementation
//!
//! Authenticates with a `key` query parameter and addresses models in the URL
//! path. No native JSON response mode.

pub mod converter;
mod provider;
mod streaming;
pub mod types;

pub use provider::{GeminiProvider, DEFAULT_API_VERSION, EMBEDDING_DIMENSIONS};
pub use types::{GeminiRequest, GeminiResponse};
