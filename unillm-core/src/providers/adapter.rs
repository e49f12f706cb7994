//! Capability contract implemented by provider adapters
//!
//! A provider implements one trait per capability it supports. Every
//! operation is pure: adapters hold only their [`ProviderConfig`] and never
//! perform I/O, so one instance can serve many concurrent requests.

use crate::config::{ProviderConfig, ProviderType};
use crate::error::{LlmError, LlmResult};
use crate::http::TransportError;
use crate::protocol::{
    AudioFormat, ChatRequest, ChatResponse, ChatStreamResponse, ContentType, EmbeddingInput,
    EmbeddingRequest, EmbeddingResponse, MediaLocation, ResponseFormat, SpeechRequest,
    SpeechResponse, Voice,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Feature a provider may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Chat,
    Embedding,
    Speech,
}

/// Path and query of a capability endpoint, relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Authentication material attached to every request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAuth {
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
}

/// Behaviour shared by every capability of one provider
pub trait ProviderAdapter: Send + Sync + 'static {
    fn config(&self) -> &ProviderConfig;

    fn provider(&self) -> ProviderType {
        self.config().provider
    }

    fn name(&self) -> &'static str {
        self.provider().as_str()
    }

    /// Headers and query parameters carrying credentials
    fn auth(&self) -> RequestAuth;

    /// Classify a transport failure into the error taxonomy
    fn map_error(&self, error: TransportError) -> LlmError;
}

/// Declared chat capability flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCapabilities {
    pub content_types: BTreeSet<ContentType>,
    pub supports_functions: bool,
    pub supports_force_function: bool,
    pub supports_json_response: bool,
    pub supports_streaming: bool,
}

impl ChatCapabilities {
    /// Universal problems plus every capability violation of `request`
    pub fn check(&self, provider: &str, request: &ChatRequest) -> Vec<String> {
        let mut problems = request.validate();
        let config = &request.config;

        if config.has_functions() && !self.supports_functions {
            problems.push(format!("function calling not supported by {provider}"));
        }
        if config.force_function.is_some() && !self.supports_force_function {
            problems.push(format!(
                "forcing a specific function is not supported by {provider}"
            ));
        }
        if config.response_format == ResponseFormat::Json && !self.supports_json_response {
            problems.push(format!(
                "native JSON response format is not supported by {provider}"
            ));
        }
        if config.stream && !self.supports_streaming {
            problems.push(format!("streaming not supported by {provider}"));
        }

        let unsupported: BTreeSet<ContentType> = request
            .parts()
            .map(|p| p.content_type())
            .filter(|t| !self.content_types.contains(t))
            .collect();
        for content_type in unsupported {
            problems.push(format!(
                "unsupported content type {} for {provider}",
                content_type.as_str()
            ));
        }

        for (i, message) in request.messages.iter().enumerate() {
            for (j, part) in message.content.iter().enumerate() {
                if let Some(MediaLocation::Path(_)) = part.media().and_then(|m| m.location()) {
                    problems.push(format!(
                        "messages[{i}].content[{j}]: filesystem media must be inlined before dispatch"
                    ));
                }
            }
        }

        problems
    }

    /// Capability required by `request` that this adapter lacks, if any
    pub fn missing_capability(&self, request: &ChatRequest) -> Option<&'static str> {
        if request.config.response_format == ResponseFormat::Json && !self.supports_json_response {
            Some("native JSON response format")
        } else if request.config.stream && !self.supports_streaming {
            Some("streaming")
        } else {
            None
        }
    }
}

/// Chat capability contract
pub trait ChatAdapter: ProviderAdapter {
    type NativeChatRequest: Serialize + Send;
    type NativeChatResponse: DeserializeOwned + Send;
    type NativeChatChunk: DeserializeOwned + Send;

    fn chat_capabilities(&self) -> &ChatCapabilities;

    fn supported_content_types(&self) -> &BTreeSet<ContentType> {
        &self.chat_capabilities().content_types
    }

    fn supports_functions(&self) -> bool {
        self.chat_capabilities().supports_functions
    }

    fn supports_json_response(&self) -> bool {
        self.chat_capabilities().supports_json_response
    }

    /// Every problem that makes `request` unacceptable to this provider
    fn validate_chat_request(&self, request: &ChatRequest) -> Vec<String> {
        self.chat_capabilities().check(self.name(), request)
    }

    fn chat_endpoint(&self, request: &ChatRequest, stream: bool) -> Endpoint;

    fn convert_chat_request(&self, request: &ChatRequest) -> LlmResult<Self::NativeChatRequest>;

    fn convert_chat_response(
        &self,
        response: Self::NativeChatResponse,
        request: &ChatRequest,
    ) -> LlmResult<ChatResponse>;

    /// Normalize one native stream event.
    ///
    /// An event may expand into several chunks (e.g. text plus whole function
    /// calls); only the last of them may be terminal.
    fn convert_chat_stream_chunk(
        &self,
        chunk: Self::NativeChatChunk,
        request: &ChatRequest,
    ) -> LlmResult<Vec<ChatStreamResponse>>;
}

/// Declared embedding capability flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingCapabilities {
    pub content_types: BTreeSet<ContentType>,
    /// Vector size of the provider's default models
    pub dimensions: u32,
}

impl EmbeddingCapabilities {
    pub fn check(&self, provider: &str, request: &EmbeddingRequest) -> Vec<String> {
        let mut problems = request.validate();
        let unsupported: BTreeSet<ContentType> = request
            .input
            .iter()
            .filter_map(|input| match input {
                EmbeddingInput::Text(_) => None,
                EmbeddingInput::Content(part) => Some(part.content_type()),
            })
            .filter(|t| !self.content_types.contains(t))
            .collect();
        for content_type in unsupported {
            problems.push(format!(
                "unsupported content type {} for {provider} embeddings",
                content_type.as_str()
            ));
        }
        problems
    }
}

/// Embedding capability contract
pub trait EmbeddingAdapter: ProviderAdapter {
    type NativeEmbeddingRequest: Serialize + Send;
    type NativeEmbeddingResponse: DeserializeOwned + Send;

    fn embedding_capabilities(&self) -> &EmbeddingCapabilities;

    fn embedding_dimensions(&self) -> u32 {
        self.embedding_capabilities().dimensions
    }

    fn validate_embedding_request(&self, request: &EmbeddingRequest) -> Vec<String> {
        self.embedding_capabilities().check(self.name(), request)
    }

    fn embedding_endpoint(&self, request: &EmbeddingRequest) -> Endpoint;

    fn convert_embedding_request(
        &self,
        request: &EmbeddingRequest,
    ) -> LlmResult<Self::NativeEmbeddingRequest>;

    fn convert_embedding_response(
        &self,
        response: Self::NativeEmbeddingResponse,
        request: &EmbeddingRequest,
    ) -> LlmResult<EmbeddingResponse>;
}

/// Declared speech capability flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCapabilities {
    pub voices: Vec<Voice>,
    pub formats: Vec<AudioFormat>,
    pub supports_pitch: bool,
    pub supports_volume: bool,
}

impl SpeechCapabilities {
    pub fn check(&self, provider: &str, request: &SpeechRequest) -> Vec<String> {
        let mut problems = request.validate();
        if !self.voices.contains(&request.voice) {
            problems.push(format!(
                "voice {} not supported by {provider}",
                request.voice.as_str()
            ));
        }
        if !self.formats.contains(&request.format) {
            problems.push(format!(
                "audio format {} not supported by {provider}",
                request.format.as_str()
            ));
        }
        if request.pitch.is_some() && !self.supports_pitch {
            problems.push(format!("pitch adjustment not supported by {provider}"));
        }
        if request.volume.is_some() && !self.supports_volume {
            problems.push(format!("volume adjustment not supported by {provider}"));
        }
        problems
    }
}

/// Speech synthesis capability contract; native responses are raw audio bytes
pub trait SpeechAdapter: ProviderAdapter {
    type NativeSpeechRequest: Serialize + Send;

    fn speech_capabilities(&self) -> &SpeechCapabilities;

    fn supported_voices(&self) -> &[Voice] {
        &self.speech_capabilities().voices
    }

    fn supported_audio_formats(&self) -> &[AudioFormat] {
        &self.speech_capabilities().formats
    }

    fn validate_speech_request(&self, request: &SpeechRequest) -> Vec<String> {
        self.speech_capabilities().check(self.name(), request)
    }

    fn speech_endpoint(&self, request: &SpeechRequest) -> Endpoint;

    fn convert_speech_request(&self, request: &SpeechRequest)
        -> LlmResult<Self::NativeSpeechRequest>;

    fn convert_speech_response(
        &self,
        audio: Vec<u8>,
        request: &SpeechRequest,
    ) -> LlmResult<SpeechResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ContentPart, Function, FunctionParameter, MediaSource, Message};

    fn text_only() -> ChatCapabilities {
        ChatCapabilities {
            content_types: [ContentType::Text].into_iter().collect(),
            supports_functions: false,
            supports_force_function: false,
            supports_json_response: false,
            supports_streaming: true,
        }
    }

    #[test]
    fn test_check_reports_capability_violations() {
        let request = ChatRequest::new(
            "m",
            vec![Message::user("look")
                .with_part(ContentPart::image(MediaSource::url("image/png", "https://x")))],
        )
        .with_functions(vec![Function::new("f", FunctionParameter::object())])
        .with_force_function("f")
        .with_response_format(ResponseFormat::Json);

        let problems = text_only().check("acme", &request);
        assert_eq!(
            problems,
            vec![
                "function calling not supported by acme".to_string(),
                "forcing a specific function is not supported by acme".to_string(),
                "native JSON response format is not supported by acme".to_string(),
                "unsupported content type image for acme".to_string(),
            ]
        );
    }

    #[test]
    fn test_check_rejects_path_media() {
        let caps = ChatCapabilities {
            content_types: [ContentType::Text, ContentType::Pdf].into_iter().collect(),
            ..text_only()
        };
        let request = ChatRequest::new(
            "m",
            vec![Message::user("read").with_part(ContentPart::pdf(MediaSource::path(
                "application/pdf",
                "/tmp/a.pdf",
            )))],
        );

        assert_eq!(
            caps.check("acme", &request),
            vec!["messages[0].content[1]: filesystem media must be inlined before dispatch".to_string()]
        );
    }

    #[test]
    fn test_missing_capability() {
        let request = ChatRequest::new("m", vec![Message::user("hi")])
            .with_response_format(ResponseFormat::Json);
        assert_eq!(
            text_only().missing_capability(&request),
            Some("native JSON response format")
        );
    }
}
