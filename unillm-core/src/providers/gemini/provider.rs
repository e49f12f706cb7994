//! Gemini adapter

use super::converter::{
    from_gemini_embedding_response, from_gemini_response, to_gemini_embedding_request,
    to_gemini_request, PROVIDER,
};
use super::streaming::from_gemini_stream_chunk;
use super::types::{GeminiEmbeddingRequest, GeminiEmbeddingResponse, GeminiRequest, GeminiResponse};
use crate::config::{CredentialSource, ProviderConfig, ProviderType};
use crate::error::{ErrorKind, LlmError, LlmResult};
use crate::http::{ErrorDetails, TransportError};
use crate::providers::adapter::{
    ChatAdapter, ChatCapabilities, EmbeddingAdapter, EmbeddingCapabilities, Endpoint,
    ProviderAdapter, RequestAuth,
};
use crate::providers::error::{classify_status, map_transport_error};
use crate::protocol::{
    ChatRequest, ChatResponse, ChatStreamResponse, ContentType, EmbeddingRequest,
    EmbeddingResponse,
};

pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Vector size of text-embedding-004
pub const EMBEDDING_DIMENSIONS: u32 = 768;

/// Gemini adapter for chat and embeddings
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    config: ProviderConfig,
    chat: ChatCapabilities,
    embedding: EmbeddingCapabilities,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            chat: ChatCapabilities {
                content_types: [
                    ContentType::Text,
                    ContentType::Image,
                    ContentType::Pdf,
                    ContentType::Video,
                    ContentType::Audio,
                ]
                .into_iter()
                .collect(),
                supports_functions: true,
                supports_force_function: true,
                supports_json_response: false,
                supports_streaming: true,
            },
            embedding: EmbeddingCapabilities {
                content_types: [ContentType::Text].into_iter().collect(),
                dimensions: EMBEDDING_DIMENSIONS,
            },
        }
    }

    pub fn from_credentials(source: &dyn CredentialSource) -> LlmResult<Self> {
        Ok(Self::new(ProviderConfig::resolve(ProviderType::Gemini, source)?))
    }

    fn api_version(&self) -> &str {
        self.config
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_API_VERSION)
    }

    fn model_path(&self, model: &str, method: &str) -> String {
        format!("/{}/models/{}:{}", self.api_version(), model, method)
    }
}

impl ProviderAdapter for GeminiProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn auth(&self) -> RequestAuth {
        RequestAuth {
            query: vec![(
                "key".to_string(),
                self.config.api_key.expose_secret().to_string(),
            )],
            ..Default::default()
        }
    }

    fn map_error(&self, error: TransportError) -> LlmError {
        map_transport_error(PROVIDER, error, classify)
    }
}

fn classify(status: u16, details: Option<&ErrorDetails>) -> ErrorKind {
    let Some(details) = details else {
        return classify_status(status);
    };
    let message = details.message.to_lowercase();

    match details.status.as_deref() {
        Some("INVALID_ARGUMENT") if message.contains("api key not valid") => ErrorKind::Authentication,
        Some("INVALID_ARGUMENT")
            if message.contains("token") && (message.contains("exceed") || message.contains("limit")) =>
        {
            ErrorKind::ContextLengthExceeded
        }
        Some("INVALID_ARGUMENT") | Some("NOT_FOUND") => ErrorKind::InvalidRequest,
        Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED") => ErrorKind::Authentication,
        Some("RESOURCE_EXHAUSTED") => ErrorKind::RateLimit,
        Some("FAILED_PRECONDITION") => ErrorKind::QuotaExceeded,
        Some(_) => ErrorKind::Provider,
        None => classify_status(status),
    }
}

impl ChatAdapter for GeminiProvider {
    type NativeChatRequest = GeminiRequest;
    type NativeChatResponse = GeminiResponse;
    type NativeChatChunk = GeminiResponse;

    fn chat_capabilities(&self) -> &ChatCapabilities {
        &self.chat
    }

    fn chat_endpoint(&self, request: &ChatRequest, stream: bool) -> Endpoint {
        if stream {
            Endpoint::new(self.model_path(&request.model, "streamGenerateContent"))
                .with_query("alt", "sse")
        } else {
            Endpoint::new(self.model_path(&request.model, "generateContent"))
        }
    }

    fn convert_chat_request(&self, request: &ChatRequest) -> LlmResult<GeminiRequest> {
        to_gemini_request(request)
    }

    fn convert_chat_response(
        &self,
        response: GeminiResponse,
        request: &ChatRequest,
    ) -> LlmResult<ChatResponse> {
        from_gemini_response(response, request)
    }

    fn convert_chat_stream_chunk(
        &self,
        chunk: GeminiResponse,
        request: &ChatRequest,
    ) -> LlmResult<Vec<ChatStreamResponse>> {
        from_gemini_stream_chunk(chunk, request)
    }
}

impl EmbeddingAdapter for GeminiProvider {
    type NativeEmbeddingRequest = GeminiEmbeddingRequest;
    type NativeEmbeddingResponse = GeminiEmbeddingResponse;

    fn embedding_capabilities(&self) -> &EmbeddingCapabilities {
        &self.embedding
    }

    fn embedding_endpoint(&self, request: &EmbeddingRequest) -> Endpoint {
        Endpoint::new(self.model_path(&request.model, "batchEmbedContents"))
    }

    fn convert_embedding_request(
        &self,
        request: &EmbeddingRequest,
    ) -> LlmResult<GeminiEmbeddingRequest> {
        to_gemini_embedding_request(request)
    }

    fn convert_embedding_response(
        &self,
        response: GeminiEmbeddingResponse,
        request: &EmbeddingRequest,
    ) -> LlmResult<EmbeddingResponse> {
        from_gemini_embedding_response(response, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;
    use serde_json::json;
    use test_case::test_case;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(ProviderConfig::new(ProviderType::Gemini, "AIza-test"))
    }

    #[test]
    fn test_auth_uses_query_key() {
        let auth = provider().auth();
        assert!(auth.headers.is_empty());
        assert_eq!(auth.query, vec![("key".to_string(), "AIza-test".to_string())]);
    }

    #[test]
    fn test_endpoints() {
        let request = ChatRequest::new("gemini-1.5-pro", vec![Message::user("hi")]);
        assert_eq!(
            provider().chat_endpoint(&request, false),
            Endpoint::new("/v1beta/models/gemini-1.5-pro:generateContent")
        );
        assert_eq!(
            provider().chat_endpoint(&request, true),
            Endpoint::new("/v1beta/models/gemini-1.5-pro:streamGenerateContent").with_query("alt", "sse")
        );

        let pinned = GeminiProvider::new(
            ProviderConfig::new(ProviderType::Gemini, "k").with_api_version("v1"),
        );
        assert_eq!(
            pinned.embedding_endpoint(&EmbeddingRequest::new("text-embedding-004", ["a"])).path,
            "/v1/models/text-embedding-004:batchEmbedContents"
        );
    }

    #[test_case(400, "INVALID_ARGUMENT", "API key not valid. Please pass a valid API key.", ErrorKind::Authentication; "bad key")]
    #[test_case(400, "INVALID_ARGUMENT", "The input token count exceeds the maximum", ErrorKind::ContextLengthExceeded; "context")]
    #[test_case(400, "INVALID_ARGUMENT", "Invalid JSON payload", ErrorKind::InvalidRequest; "invalid")]
    #[test_case(403, "PERMISSION_DENIED", "denied", ErrorKind::Authentication; "permission")]
    #[test_case(429, "RESOURCE_EXHAUSTED", "Quota exceeded for requests per minute", ErrorKind::RateLimit; "rate limit")]
    #[test_case(400, "FAILED_PRECONDITION", "Free tier not available in your country", ErrorKind::QuotaExceeded; "precondition")]
    #[test_case(404, "NOT_FOUND", "models/x is not found", ErrorKind::InvalidRequest; "not found")]
    #[test_case(500, "INTERNAL", "internal error", ErrorKind::Provider; "internal")]
    fn test_error_classification(status: u16, code: &str, message: &str, expected: ErrorKind) {
        let err = provider().map_error(TransportError::Status {
            status,
            body: json!({"error": {"code": status, "message": message, "status": code}}),
            retry_after: None,
        });
        assert_eq!(err.kind, expected);
        assert_eq!(err.provider, "gemini");
        assert_eq!(err.code.as_deref(), Some(code));
    }
}
