//! Anthropic adapter

use super::converter::{from_anthropic_response, to_anthropic_request, PROVIDER};
use super::streaming::from_anthropic_stream_event;
use super::types::{AnthropicRequest, AnthropicResponse, AnthropicStreamEvent};
use crate::config::{CredentialSource, ProviderConfig, ProviderType};
use crate::error::{ErrorKind, LlmError, LlmResult};
use crate::http::{ErrorDetails, TransportError};
use crate::providers::adapter::{
    ChatAdapter, ChatCapabilities, Endpoint, ProviderAdapter, RequestAuth,
};
use crate::providers::error::{classify_status, map_transport_error};
use crate::protocol::{ChatRequest, ChatResponse, ChatStreamResponse, ContentType};

pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Largest decoded inline payload accepted in one content block
pub const MAX_INLINE_BYTES: usize = 100 * 1024 * 1024;

/// Anthropic adapter; chat only
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    config: ProviderConfig,
    chat: ChatCapabilities,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            chat: ChatCapabilities {
                content_types: [ContentType::Text, ContentType::Image, ContentType::Pdf]
                    .into_iter()
                    .collect(),
                supports_functions: true,
                supports_force_function: false,
                supports_json_response: false,
                supports_streaming: true,
            },
        }
    }

    pub fn from_credentials(source: &dyn CredentialSource) -> LlmResult<Self> {
        Ok(Self::new(ProviderConfig::resolve(ProviderType::Anthropic, source)?))
    }

    fn api_version(&self) -> &str {
        self.config
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_API_VERSION)
    }
}

impl ProviderAdapter for AnthropicProvider {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn auth(&self) -> RequestAuth {
        let mut auth = RequestAuth::default();
        auth.headers.insert(
            "x-api-key".to_string(),
            self.config.api_key.expose_secret().to_string(),
        );
        auth.headers
            .insert("anthropic-version".to_string(), self.api_version().to_string());
        auth
    }

    fn map_error(&self, error: TransportError) -> LlmError {
        map_transport_error(PROVIDER, error, classify)
    }
}

fn classify(status: u16, details: Option<&ErrorDetails>) -> ErrorKind {
    match details.and_then(|d| d.error_type.as_deref().map(|t| (t, d.message.as_str()))) {
        Some((error_type, message)) => match classify_error_type(error_type, message) {
            ErrorKind::Provider => classify_status(status),
            kind => kind,
        },
        None => classify_status(status),
    }
}

/// Kind for an Anthropic `error.type`, refined by message text
pub(super) fn classify_error_type(error_type: &str, message: &str) -> ErrorKind {
    let message = message.to_lowercase();
    match error_type {
        "authentication_error" | "permission_error" => ErrorKind::Authentication,
        "rate_limit_error" => ErrorKind::RateLimit,
        "invalid_request_error" if message.contains("prompt is too long") => {
            ErrorKind::ContextLengthExceeded
        }
        "invalid_request_error" if message.contains("credit balance") => ErrorKind::QuotaExceeded,
        "invalid_request_error" | "not_found_error" | "request_too_large" => {
            ErrorKind::InvalidRequest
        }
        _ => ErrorKind::Provider,
    }
}

impl ChatAdapter for AnthropicProvider {
    type NativeChatRequest = AnthropicRequest;
    type NativeChatResponse = AnthropicResponse;
    type NativeChatChunk = AnthropicStreamEvent;

    fn chat_capabilities(&self) -> &ChatCapabilities {
        &self.chat
    }

    fn validate_chat_request(&self, request: &ChatRequest) -> Vec<String> {
        let mut problems = self.chat.check(PROVIDER, request);
        for (i, message) in request.messages.iter().enumerate() {
            for (j, part) in message.content.iter().enumerate() {
                if let Some(size) = part.media().and_then(|m| m.inline_size()) {
                    if size > MAX_INLINE_BYTES {
                        problems.push(format!(
                            "messages[{i}].content[{j}]: inline payload of {size} bytes exceeds the {MAX_INLINE_BYTES} byte limit"
                        ));
                    }
                }
            }
        }
        problems
    }

    fn chat_endpoint(&self, _request: &ChatRequest, _stream: bool) -> Endpoint {
        Endpoint::new("/v1/messages")
    }

    fn convert_chat_request(&self, request: &ChatRequest) -> LlmResult<AnthropicRequest> {
        to_anthropic_request(request)
    }

    fn convert_chat_response(
        &self,
        response: AnthropicResponse,
        request: &ChatRequest,
    ) -> LlmResult<ChatResponse> {
        from_anthropic_response(response, request)
    }

    fn convert_chat_stream_chunk(
        &self,
        chunk: AnthropicStreamEvent,
        request: &ChatRequest,
    ) -> LlmResult<Vec<ChatStreamResponse>> {
        from_anthropic_stream_event(chunk, request).map(|chunk| vec![chunk])
    }
}
