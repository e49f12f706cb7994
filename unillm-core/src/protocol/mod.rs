//! Universal model for LLM requests and responses
//!
//! These structures are provider-agnostic. Every type carries its own
//! schema-level `validate()` returning the complete list of problems found;
//! provider-specific acceptability is checked by the adapters.

pub mod embedding;
pub mod speech;
pub mod types;

pub use embedding::{Embedding, EmbeddingInput, EmbeddingRequest, EmbeddingResponse, EncodingFormat};
pub use speech::{AudioFormat, SpeechRequest, SpeechResponse, Voice};
pub use types::{
    ChatRequest, ChatResponse, ChatStreamResponse, ContentPart, ContentType, FinishReason,
    Function, FunctionCall, FunctionCallDelta, FunctionParameter, GenerationConfig, MediaLocation,
    MediaSource, Message, MessageRole, ResponseFormat, ResponseMetadata, StreamDelta, Usage,
};
