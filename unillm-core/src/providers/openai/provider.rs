//! OpenAI adapter

use super::converter::{from_openai_response, to_openai_request, PROVIDER};
use super::embeddings::{from_openai_embedding_response, to_openai_embedding_request};
use super::speech::{from_openai_speech_response, to_openai_speech_request};
use super::streaming::from_openai_stream_chunk;
use super::types::*;
use crate::config::{CredentialSource, ProviderConfig, ProviderType};
use crate::error::{ErrorKind, LlmError, LlmResult};
use crate::http::{ErrorDetails, TransportError};
use crate::providers::adapter::{
    ChatAdapter, ChatCapabilities, EmbeddingAdapter, EmbeddingCapabilities, Endpoint,
    ProviderAdapter, RequestAuth, SpeechAdapter, SpeechCapabilities,
};
use crate::providers::error::{classify_status, map_transport_error};
use crate::protocol::{
    AudioFormat, ChatRequest, ChatResponse, ChatStreamResponse, ContentType, EmbeddingRequest,
    EmbeddingResponse, SpeechRequest, SpeechResponse, Voice,
};

/// Vector size of text-embedding-3-small and ada-002
pub const EMBEDDING_DIMENSIONS: u32 = 1536;

/// OpenAI adapter for chat, embeddings and speech
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    config: ProviderConfig,
    chat: ChatCapabilities,
    embedding: EmbeddingCapabilities,
    speech: SpeechCapabilities,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            chat: ChatCapabilities {
                content_types: [ContentType::Text, ContentType::Image].into_iter().collect(),
                supports_functions: true,
                supports_force_function: true,
                supports_json_response: true,
                supports_streaming: true,
            },
            embedding: EmbeddingCapabilities {
                content_types: [ContentType::Text].into_iter().collect(),
                dimensions: EMBEDDING_DIMENSIONS,
            },
            speech: SpeechCapabilities {
                voices: vec![
                    Voice::Male1,
                    Voice::Male2,
                    Voice::Female1,
                    Voice::Female2,
                    Voice::Neutral,
                ],
                formats: vec![AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Flac],
                supports_pitch: false,
                supports_volume: false,
            },
        }
    }

    /// Build from a credential source (config file, environment, ...)
    pub fn from_credentials(source: &dyn CredentialSource) -> LlmResult<Self> {
        Ok(Self::new(ProviderConfig::resolve(ProviderType::OpenAI, source)?))
    }
}

impl ProviderAdapter for OpenAIProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn auth(&self) -> RequestAuth {
        let mut auth = RequestAuth::default();
        auth.headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.api_key.expose_secret()),
        );
        if let Some(org) = &self.config.organization_id {
            auth.headers
                .insert("OpenAI-Organization".to_string(), org.clone());
        }
        auth
    }

    fn map_error(&self, error: TransportError) -> LlmError {
        map_transport_error(PROVIDER, error, classify)
    }
}

fn classify(status: u16, details: Option<&ErrorDetails>) -> ErrorKind {
    let code = details.and_then(|d| d.code.as_deref().or(d.error_type.as_deref()));
    match code {
        Some("context_length_exceeded") => ErrorKind::ContextLengthExceeded,
        Some("insufficient_quota") => ErrorKind::QuotaExceeded,
        Some("invalid_api_key") => ErrorKind::Authentication,
        _ => classify_status(status),
    }
}

impl ChatAdapter for OpenAIProvider {
    type NativeChatRequest = OpenAIRequest;
    type NativeChatResponse = OpenAIResponse;
    type NativeChatChunk = OpenAIStreamChunk;

    fn chat_capabilities(&self) -> &ChatCapabilities {
        &self.chat
    }

    fn validate_chat_request(&self, request: &ChatRequest) -> Vec<String> {
        let mut problems = self.chat.check(PROVIDER, request);
        if request.config.top_k.is_some() {
            problems.push(format!("top_k is not supported by {PROVIDER}"));
        }
        problems
    }

    fn chat_endpoint(&self, _request: &ChatRequest, _stream: bool) -> Endpoint {
        Endpoint::new("/v1/chat/completions")
    }

    fn convert_chat_request(&self, request: &ChatRequest) -> LlmResult<OpenAIRequest> {
        to_openai_request(request)
    }

    fn convert_chat_response(
        &self,
        response: OpenAIResponse,
        request: &ChatRequest,
    ) -> LlmResult<ChatResponse> {
        from_openai_response(response, request)
    }

    fn convert_chat_stream_chunk(
        &self,
        chunk: OpenAIStreamChunk,
        request: &ChatRequest,
    ) -> LlmResult<Vec<ChatStreamResponse>> {
        from_openai_stream_chunk(chunk, request).map(|chunk| vec![chunk])
    }
}

impl EmbeddingAdapter for OpenAIProvider {
    type NativeEmbeddingRequest = OpenAIEmbeddingRequest;
    type NativeEmbeddingResponse = OpenAIEmbeddingResponse;

    fn embedding_capabilities(&self) -> &EmbeddingCapabilities {
        &self.embedding
    }

    fn embedding_endpoint(&self, _request: &EmbeddingRequest) -> Endpoint {
        Endpoint::new("/v1/embeddings")
    }

    fn convert_embedding_request(
        &self,
        request: &EmbeddingRequest,
    ) -> LlmResult<OpenAIEmbeddingRequest> {
        to_openai_embedding_request(request)
    }

    fn convert_embedding_response(
        &self,
        response: OpenAIEmbeddingResponse,
        request: &EmbeddingRequest,
    ) -> LlmResult<EmbeddingResponse> {
        from_openai_embedding_response(response, request)
    }
}

impl SpeechAdapter for OpenAIProvider {
    type NativeSpeechRequest = OpenAISpeechRequest;

    fn speech_capabilities(&self) -> &SpeechCapabilities {
        &self.speech
    }

    fn speech_endpoint(&self, _request: &SpeechRequest) -> Endpoint {
        Endpoint::new("/v1/audio/speech")
    }

    fn convert_speech_request(&self, request: &SpeechRequest) -> LlmResult<OpenAISpeechRequest> {
        to_openai_speech_request(request)
    }

    fn convert_speech_response(
        &self,
        audio: Vec<u8>,
        request: &SpeechRequest,
    ) -> LlmResult<SpeechResponse> {
        from_openai_speech_response(audio, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;
    use serde_json::json;
    use test_case::test_case;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(
            ProviderConfig::new(ProviderType::OpenAI, "sk-test").with_organization("org-1"),
        )
    }

    #[test]
    fn test_auth_headers() {
        let auth = provider().auth();
        assert_eq!(auth.headers["Authorization"], "Bearer sk-test");
        assert_eq!(auth.headers["OpenAI-Organization"], "org-1");
        assert!(auth.query.is_empty());
    }

    #[test]
    fn test_top_k_rejected() {
        let request = ChatRequest::new("gpt-4o", vec![Message::user("hi")]).with_top_k(5);
        assert_eq!(
            provider().validate_chat_request(&request),
            vec!["top_k is not supported by openai".to_string()]
        );
    }

    #[test]
    fn test_speech_rejects_pitch_and_ogg() {
        let request = SpeechRequest::new("tts-1", "hello", Voice::Neutral)
            .with_format(AudioFormat::Ogg)
            .with_pitch(2.0);
        assert_eq!(
            provider().validate_speech_request(&request),
            vec![
                "audio format ogg not supported by openai".to_string(),
                "pitch adjustment not supported by openai".to_string(),
            ]
        );
    }

    #[test_case(401, json!({"error": {"message": "bad key", "type": "invalid_request_error", "code": "invalid_api_key"}}), ErrorKind::Authentication; "invalid key")]
    #[test_case(429, json!({"error": {"message": "slow", "type": "requests", "code": "rate_limit_exceeded"}}), ErrorKind::RateLimit; "rate limit")]
    #[test_case(429, json!({"error": {"message": "quota", "type": "insufficient_quota", "code": "insufficient_quota"}}), ErrorKind::QuotaExceeded; "quota")]
    #[test_case(400, json!({"error": {"message": "too long", "type": "invalid_request_error", "code": "context_length_exceeded"}}), ErrorKind::ContextLengthExceeded; "context length")]
    #[test_case(404, json!({"error": {"message": "no model", "type": "invalid_request_error", "code": "model_not_found"}}), ErrorKind::InvalidRequest; "model not found")]
    #[test_case(500, json!({"error": {"message": "oops", "type": "server_error", "code": null}}), ErrorKind::Provider; "server error")]
    fn test_error_classification(status: u16, body: serde_json::Value, expected: ErrorKind) {
        let err = provider().map_error(TransportError::Status {
            status,
            body,
            retry_after: None,
        });
        assert_eq!(err.kind, expected);
        assert_eq!(err.provider, "openai");
    }
}
