//! Service facade
//!
//! [`LlmService`] holds an optional handle per capability. Calling a
//! capability that was never bound is an `UnsupportedOperation` error naming
//! the bound provider, so callers can probe with `has_*` or just try.

use crate::config::{CredentialSource, LoggingSettings, ProviderConfig, ProviderType};
use crate::dispatch::{
    ChatCompletion, ChatDispatcher, ChatStream, EmbeddingDispatcher, EmbeddingGeneration,
    SpeechDispatcher, SpeechSynthesis,
};
use crate::error::{LlmError, LlmResult};
use crate::http::Transport;
use crate::protocol::{
    ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, SpeechRequest, SpeechResponse,
};
use crate::providers::{AnthropicProvider, GeminiProvider, OpenAIProvider};
use std::sync::Arc;
use tracing::info;

/// Error identity of a service with nothing bound
const UNBOUND: &str = "service";

/// Capability-checked entry point for chat, embeddings and speech
#[derive(Clone, Default)]
pub struct LlmService {
    provider: Option<ProviderType>,
    chat: Option<Arc<dyn ChatCompletion>>,
    embedding: Option<Arc<dyn EmbeddingGeneration>>,
    speech: Option<Arc<dyn SpeechSynthesis>>,
}

impl LlmService {
    pub fn builder() -> LlmServiceBuilder {
        LlmServiceBuilder::default()
    }

    /// Bind every capability `provider` implements
    pub fn for_provider(
        provider: ProviderType,
        credentials: &dyn CredentialSource,
        transport: Arc<dyn Transport>,
    ) -> LlmResult<Self> {
        Self::for_provider_with_logging(provider, credentials, transport, LoggingSettings::default())
    }

    pub fn for_provider_with_logging(
        provider: ProviderType,
        credentials: &dyn CredentialSource,
        transport: Arc<dyn Transport>,
        logging: LoggingSettings,
    ) -> LlmResult<Self> {
        let config = ProviderConfig::resolve(provider, credentials)?;

        let service = match provider {
            ProviderType::OpenAI => {
                let adapter = OpenAIProvider::new(config);
                Self::builder()
                    .chat(ChatDispatcher::new(adapter.clone(), transport.clone()).with_logging(logging))
                    .embedding(
                        EmbeddingDispatcher::new(adapter.clone(), transport.clone())
                            .with_logging(logging),
                    )
                    .speech(SpeechDispatcher::new(adapter, transport).with_logging(logging))
                    .build()
            }
            ProviderType::Anthropic => Self::builder()
                .chat(
                    ChatDispatcher::new(AnthropicProvider::new(config), transport)
                        .with_logging(logging),
                )
                .build(),
            ProviderType::Gemini => {
                let adapter = GeminiProvider::new(config);
                Self::builder()
                    .chat(ChatDispatcher::new(adapter.clone(), transport.clone()).with_logging(logging))
                    .embedding(EmbeddingDispatcher::new(adapter, transport).with_logging(logging))
                    .build()
            }
        };

        info!(
            provider = provider.as_str(),
            chat = service.has_chat(),
            embedding = service.has_embedding(),
            speech = service.has_speech(),
            "service bound"
        );
        Ok(service)
    }

    /// Provider of the first capability bound, if any
    pub fn provider(&self) -> Option<ProviderType> {
        self.provider
    }

    fn identity(&self) -> &'static str {
        self.provider.as_ref().map_or(UNBOUND, ProviderType::as_str)
    }

    fn unsupported(&self, capability: &str) -> LlmError {
        LlmError::unsupported(
            self.identity(),
            format!("{} is not configured for {}", capability, self.identity()),
        )
    }

    pub fn has_chat(&self) -> bool {
        self.chat.is_some()
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    pub fn has_speech(&self) -> bool {
        self.speech.is_some()
    }

    fn chat(&self) -> LlmResult<&Arc<dyn ChatCompletion>> {
        self.chat
            .as_ref()
            .ok_or_else(|| self.unsupported("chat completion"))
    }

    pub async fn complete_chat(&self, request: &ChatRequest) -> LlmResult<ChatResponse> {
        self.chat()?.complete(request).await
    }

    pub async fn stream_chat(&self, request: &ChatRequest) -> LlmResult<ChatStream> {
        self.chat()?.stream(request).await
    }

    pub async fn generate_embedding(
        &self,
        request: &EmbeddingRequest,
    ) -> LlmResult<EmbeddingResponse> {
        let embedding = self
            .embedding
            .as_ref()
            .ok_or_else(|| self.unsupported("embedding generation"))?;
        embedding.generate(request).await
    }

    pub async fn synthesize_speech(&self, request: &SpeechRequest) -> LlmResult<SpeechResponse> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| self.unsupported("speech synthesis"))?;
        speech.synthesize(request).await
    }
}

/// Builder for [`LlmService`]
#[derive(Default)]
pub struct LlmServiceBuilder {
    service: LlmService,
}

impl LlmServiceBuilder {
    pub fn chat(mut self, chat: impl ChatCompletion + 'static) -> Self {
        self.service.provider.get_or_insert(chat.provider());
        self.service.chat = Some(Arc::new(chat));
        self
    }

    pub fn embedding(mut self, embedding: impl EmbeddingGeneration + 'static) -> Self {
        self.service.provider.get_or_insert(embedding.provider());
        self.service.embedding = Some(Arc::new(embedding));
        self
    }

    pub fn speech(mut self, speech: impl SpeechSynthesis + 'static) -> Self {
        self.service.provider.get_or_insert(speech.provider());
        self.service.speech = Some(Arc::new(speech));
        self
    }

    pub fn build(self) -> LlmService {
        self.service
    }
}
