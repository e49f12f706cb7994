//! Request dispatch
//!
//! One dispatcher per capability drives a request through
//! validating, converting, transporting and converting back. Each stage runs
//! at most once and the first failure ends the call:
//!
//! - a blank api key or a non-empty validation result returns before the
//!   adapter converts anything or the transport is called
//! - every transport failure, and every response body that does not decode
//!   into the vendor shape, goes through the adapter's `map_error`
//!
//! The dispatchers are exposed to callers through the object-safe
//! [`ChatCompletion`], [`EmbeddingGeneration`] and [`SpeechSynthesis`] traits.

use crate::config::{LoggingSettings, ProviderType};
use crate::error::{LlmError, LlmResult};
use crate::http::{HttpRequest, RawResponse, RawStream, ResponseShape, Transport, TransportError};
use crate::middleware::{DispatchStage, Operation, RequestLogger};
use crate::protocol::{
    ChatRequest, ChatResponse, ChatStreamResponse, EmbeddingRequest, EmbeddingResponse,
    SpeechRequest, SpeechResponse,
};
use crate::providers::adapter::{
    ChatAdapter, EmbeddingAdapter, Endpoint, ProviderAdapter, SpeechAdapter,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Stream of normalized chat chunks; dropping it cancels delivery
pub type ChatStream = BoxStream<'static, LlmResult<ChatStreamResponse>>;

/// Chat capability as seen by callers
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    fn provider(&self) -> ProviderType;

    async fn complete(&self, request: &ChatRequest) -> LlmResult<ChatResponse>;

    async fn stream(&self, request: &ChatRequest) -> LlmResult<ChatStream>;
}

/// Embedding capability as seen by callers
#[async_trait]
pub trait EmbeddingGeneration: Send + Sync {
    fn provider(&self) -> ProviderType;

    async fn generate(&self, request: &EmbeddingRequest) -> LlmResult<EmbeddingResponse>;
}

/// Speech capability as seen by callers
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    fn provider(&self) -> ProviderType;

    async fn synthesize(&self, request: &SpeechRequest) -> LlmResult<SpeechResponse>;
}

/// A blank api key is rejected before anything is converted or sent
fn check_credentials<P: ProviderAdapter + ?Sized>(adapter: &P) -> LlmResult<()> {
    if adapter.config().api_key.expose_secret().trim().is_empty() {
        return Err(LlmError::configuration(
            adapter.name(),
            format!("missing api_key for provider '{}'", adapter.name()),
        ));
    }
    Ok(())
}

/// Build the outbound request for `endpoint` with the adapter's credentials
fn build_request<P: ProviderAdapter + ?Sized>(
    adapter: &P,
    endpoint: Endpoint,
    body: Value,
    expect: ResponseShape,
    request_id: Uuid,
) -> HttpRequest {
    let auth = adapter.auth();
    let mut headers = auth.headers;
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    HttpRequest::post(format!("{}{}", adapter.config().base(), endpoint.path), body)
        .with_headers(headers)
        .with_query(endpoint.query)
        .with_query(auth.query)
        .expecting(expect)
        .with_request_id(request_id)
}

fn encode<P: ProviderAdapter + ?Sized, T: Serialize>(adapter: &P, native: &T) -> LlmResult<Value> {
    serde_json::to_value(native).map_err(|e| {
        LlmError::provider(adapter.name(), format!("failed to encode native request: {}", e))
            .with_code("encode")
    })
}

/// Decode a JSON body into the vendor shape
fn decode<T: DeserializeOwned>(body: Value) -> Result<T, TransportError> {
    T::deserialize(&body).map_err(|e| TransportError::Decode {
        message: format!("unexpected response shape: {}", e),
        body: Some(body.clone()),
    })
}

fn expect_json(response: RawResponse) -> Result<Value, TransportError> {
    match response {
        RawResponse::Json(body) => Ok(body),
        RawResponse::Bytes(bytes) => Err(TransportError::Decode {
            message: format!("expected a JSON body, got {} bytes", bytes.len()),
            body: None,
        }),
    }
}

fn expect_bytes(response: RawResponse) -> Result<Vec<u8>, TransportError> {
    match response {
        RawResponse::Bytes(bytes) => Ok(bytes),
        RawResponse::Json(body) => Err(TransportError::Decode {
            message: "expected audio bytes, got a JSON body".to_string(),
            body: Some(body),
        }),
    }
}

/// Record the outcome on the logger and hand the result back
fn finish<T: Serialize>(mut logger: RequestLogger, result: LlmResult<T>) -> LlmResult<T> {
    match &result {
        Ok(response) => {
            logger.log_response(response);
            logger.complete();
        }
        Err(err) => logger.fail(err),
    }
    result
}

fn with_stream_flag(request: &ChatRequest, stream: bool) -> Cow<'_, ChatRequest> {
    if request.config.stream == stream {
        Cow::Borrowed(request)
    } else {
        let mut owned = request.clone();
        owned.config.stream = stream;
        Cow::Owned(owned)
    }
}

/// Chat dispatcher for one adapter
pub struct ChatDispatcher<A: ChatAdapter> {
    adapter: Arc<A>,
    transport: Arc<dyn Transport>,
    logging: LoggingSettings,
}

impl<A: ChatAdapter> ChatDispatcher<A> {
    pub fn new(adapter: A, transport: Arc<dyn Transport>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            transport,
            logging: LoggingSettings::default(),
        }
    }

    pub fn with_logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = logging;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Credentials, capability gate, then validation
    fn admit(&self, request: &ChatRequest) -> LlmResult<()> {
        check_credentials(self.adapter.as_ref())?;
        let name = self.adapter.name();
        if let Some(missing) = self.adapter.chat_capabilities().missing_capability(request) {
            return Err(LlmError::unsupported(
                name,
                format!("{} is not supported by {}", missing, name),
            ));
        }

        let problems = self.adapter.validate_chat_request(request);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(LlmError::validation(name, problems))
        }
    }

    /// Validate and convert; returns the outbound request
    fn prepare(
        &self,
        request: &ChatRequest,
        logger: &mut RequestLogger,
        expect: ResponseShape,
    ) -> LlmResult<HttpRequest> {
        self.admit(request)?;

        logger.enter(DispatchStage::Converting);
        let native = self.adapter.convert_chat_request(request)?;
        let body = encode(self.adapter.as_ref(), &native)?;
        logger.log_request(&body);

        let endpoint = self.adapter.chat_endpoint(request, request.config.stream);
        Ok(build_request(
            self.adapter.as_ref(),
            endpoint,
            body,
            expect,
            logger.request_id(),
        ))
    }

    async fn run_complete(
        &self,
        request: &ChatRequest,
        logger: &mut RequestLogger,
    ) -> LlmResult<ChatResponse> {
        let http = self.prepare(request, logger, ResponseShape::Json)?;

        logger.enter(DispatchStage::Transporting);
        let native = self
            .transport
            .send(http)
            .await
            .and_then(expect_json)
            .and_then(decode::<A::NativeChatResponse>)
            .map_err(|e| self.adapter.map_error(e))?;

        logger.enter(DispatchStage::ConvertingBack);
        self.adapter.convert_chat_response(native, request)
    }
}

/// Per-stream state threaded through the unfold
struct ChunkState<A: ChatAdapter> {
    adapter: Arc<A>,
    request: ChatRequest,
    events: RawStream,
    logger: RequestLogger,
    /// Chunks of the last event not yet handed out
    pending: VecDeque<ChatStreamResponse>,
    chunks: usize,
    finished: bool,
}

impl<A: ChatAdapter> ChunkState<A> {
    fn convert(&self, event: Result<Value, TransportError>) -> LlmResult<Vec<ChatStreamResponse>> {
        let native = event
            .and_then(decode::<A::NativeChatChunk>)
            .map_err(|e| self.adapter.map_error(e))?;
        self.adapter.convert_chat_stream_chunk(native, &self.request)
    }

    /// Next normalized chunk, pulling events until one yields something
    async fn next_chunk(&mut self) -> Option<LlmResult<ChatStreamResponse>> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Some(Ok(chunk));
            }
            let event = self.events.next().await?;
            match self.convert(event) {
                Ok(chunks) => self.pending.extend(chunks),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

fn chunk_stream<A: ChatAdapter>(state: ChunkState<A>) -> ChatStream {
    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        let Some(item) = state.next_chunk().await else {
            debug!(chunks = state.chunks, "event stream closed by transport");
            state.logger.complete();
            return None;
        };

        state.chunks += 1;
        match &item {
            Ok(chunk) if chunk.done => {
                state.finished = true;
                state.logger.complete();
            }
            Ok(_) => {}
            Err(err) => {
                state.finished = true;
                state.logger.fail(err);
            }
        }
        Some((item, state))
    })
    .boxed()
}

#[async_trait]
impl<A: ChatAdapter> ChatCompletion for ChatDispatcher<A> {
    fn provider(&self) -> ProviderType {
        self.adapter.provider()
    }

    async fn complete(&self, request: &ChatRequest) -> LlmResult<ChatResponse> {
        let request = with_stream_flag(request, false);
        let mut logger =
            RequestLogger::start(self.adapter.name(), Operation::ChatCompletion, self.logging);
        let result = self.run_complete(&request, &mut logger).await;
        finish(logger, result)
    }

    async fn stream(&self, request: &ChatRequest) -> LlmResult<ChatStream> {
        let request = with_stream_flag(request, true).into_owned();
        let mut logger =
            RequestLogger::start(self.adapter.name(), Operation::ChatStream, self.logging);

        let http = match self.prepare(&request, &mut logger, ResponseShape::EventStream) {
            Ok(http) => http,
            Err(err) => {
                logger.fail(&err);
                return Err(err);
            }
        };

        logger.enter(DispatchStage::Transporting);
        let events = match self.transport.send_stream(http).await {
            Ok(events) => events,
            Err(e) => {
                let err = self.adapter.map_error(e);
                logger.fail(&err);
                return Err(err);
            }
        };

        logger.enter(DispatchStage::Streaming);
        Ok(chunk_stream(ChunkState {
            adapter: Arc::clone(&self.adapter),
            request,
            events,
            logger,
            pending: VecDeque::new(),
            chunks: 0,
            finished: false,
        }))
    }
}

/// Embedding dispatcher for one adapter
pub struct EmbeddingDispatcher<A: EmbeddingAdapter> {
    adapter: Arc<A>,
    transport: Arc<dyn Transport>,
    logging: LoggingSettings,
}

impl<A: EmbeddingAdapter> EmbeddingDispatcher<A> {
    pub fn new(adapter: A, transport: Arc<dyn Transport>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            transport,
            logging: LoggingSettings::default(),
        }
    }

    pub fn with_logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = logging;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn run(
        &self,
        request: &EmbeddingRequest,
        logger: &mut RequestLogger,
    ) -> LlmResult<EmbeddingResponse> {
        check_credentials(self.adapter.as_ref())?;
        let problems = self.adapter.validate_embedding_request(request);
        if !problems.is_empty() {
            return Err(LlmError::validation(self.adapter.name(), problems));
        }

        logger.enter(DispatchStage::Converting);
        let native = self.adapter.convert_embedding_request(request)?;
        let body = encode(self.adapter.as_ref(), &native)?;
        logger.log_request(&body);
        let http = build_request(
            self.adapter.as_ref(),
            self.adapter.embedding_endpoint(request),
            body,
            ResponseShape::Json,
            logger.request_id(),
        );

        logger.enter(DispatchStage::Transporting);
        let native = self
            .transport
            .send(http)
            .await
            .and_then(expect_json)
            .and_then(decode::<A::NativeEmbeddingResponse>)
            .map_err(|e| self.adapter.map_error(e))?;

        logger.enter(DispatchStage::ConvertingBack);
        self.adapter.convert_embedding_response(native, request)
    }
}

#[async_trait]
impl<A: EmbeddingAdapter> EmbeddingGeneration for EmbeddingDispatcher<A> {
    fn provider(&self) -> ProviderType {
        self.adapter.provider()
    }

    async fn generate(&self, request: &EmbeddingRequest) -> LlmResult<EmbeddingResponse> {
        let mut logger =
            RequestLogger::start(self.adapter.name(), Operation::Embedding, self.logging);
        let result = self.run(request, &mut logger).await;
        finish(logger, result)
    }
}

/// Speech dispatcher for one adapter
pub struct SpeechDispatcher<A: SpeechAdapter> {
    adapter: Arc<A>,
    transport: Arc<dyn Transport>,
    logging: LoggingSettings,
}

/// Loggable summary of a synthesized clip
#[derive(Serialize)]
struct AudioSummary<'a> {
    id: &'a str,
    format: &'a str,
    bytes: usize,
}

impl<A: SpeechAdapter> SpeechDispatcher<A> {
    pub fn new(adapter: A, transport: Arc<dyn Transport>) -> Self {
        Self {
            adapter: Arc::new(adapter),
            transport,
            logging: LoggingSettings::default(),
        }
    }

    pub fn with_logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = logging;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    async fn run(
        &self,
        request: &SpeechRequest,
        logger: &mut RequestLogger,
    ) -> LlmResult<SpeechResponse> {
        check_credentials(self.adapter.as_ref())?;
        let problems = self.adapter.validate_speech_request(request);
        if !problems.is_empty() {
            return Err(LlmError::validation(self.adapter.name(), problems));
        }

        logger.enter(DispatchStage::Converting);
        let native = self.adapter.convert_speech_request(request)?;
        let body = encode(self.adapter.as_ref(), &native)?;
        logger.log_request(&body);
        let http = build_request(
            self.adapter.as_ref(),
            self.adapter.speech_endpoint(request),
            body,
            ResponseShape::Bytes,
            logger.request_id(),
        );

        logger.enter(DispatchStage::Transporting);
        let audio = self
            .transport
            .send(http)
            .await
            .and_then(expect_bytes)
            .map_err(|e| self.adapter.map_error(e))?;

        logger.enter(DispatchStage::ConvertingBack);
        self.adapter.convert_speech_response(audio, request)
    }
}

#[async_trait]
impl<A: SpeechAdapter> SpeechSynthesis for SpeechDispatcher<A> {
    fn provider(&self) -> ProviderType {
        self.adapter.provider()
    }

    async fn synthesize(&self, request: &SpeechRequest) -> LlmResult<SpeechResponse> {
        let mut logger = RequestLogger::start(self.adapter.name(), Operation::Speech, self.logging);
        let result = self.run(request, &mut logger).await;

        // Audio payloads are summarized rather than logged
        match &result {
            Ok(response) => {
                logger.log_response(&AudioSummary {
                    id: &response.id,
                    format: response.format.as_str(),
                    bytes: response.audio.len(),
                });
                logger.complete();
            }
            Err(err) => logger.fail(err),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::error::ErrorKind;
    use crate::protocol::{Message, ResponseFormat, Voice};
    use crate::providers::anthropic::AnthropicProvider;
    use crate::providers::openai::OpenAIProvider;
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport returning one scripted reply and recording every request
    #[derive(Default)]
    struct Scripted {
        reply: Mutex<Option<Result<RawResponse, TransportError>>>,
        events: Mutex<Vec<Result<Value, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn replying(reply: Result<RawResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                ..Default::default()
            })
        }

        fn streaming(events: Vec<Result<Value, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(events),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(TransportError::Stream("no reply scripted".into())))
        }

        async fn send_stream(&self, request: HttpRequest) -> Result<RawStream, TransportError> {
            self.seen.lock().unwrap().push(request);
            let events = std::mem::take(&mut *self.events.lock().unwrap());
            Ok(stream::iter(events).boxed())
        }
    }

    fn openai(transport: Arc<Scripted>) -> ChatDispatcher<OpenAIProvider> {
        ChatDispatcher::new(
            OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI, "sk-test")),
            transport,
        )
    }

    #[tokio::test]
    async fn test_validation_failure_skips_transport() {
        let transport = Scripted::replying(Ok(RawResponse::Json(json!({}))));
        let dispatcher = openai(Arc::clone(&transport));

        let err = dispatcher
            .complete(&ChatRequest::new("", Vec::new()))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.problems.len() >= 2);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_api_key_never_reaches_transport() {
        let transport = Scripted::replying(Ok(RawResponse::Json(json!({}))));
        let chat = ChatDispatcher::new(
            OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI, "")),
            transport.clone(),
        );
        let err = chat
            .complete(&ChatRequest::new("m1", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(err.provider, "openai");

        let err = chat
            .stream(&ChatRequest::new("m1", vec![Message::user("hi")]))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::Configuration);

        let embedding = EmbeddingDispatcher::new(
            OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI, "  ")),
            transport.clone(),
        );
        let err = embedding
            .generate(&EmbeddingRequest::new("text-embedding-3-small", ["a"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);

        let speech = SpeechDispatcher::new(
            OpenAIProvider::new(ProviderConfig::new(ProviderType::OpenAI, "")),
            transport.clone(),
        );
        let err = speech
            .synthesize(&SpeechRequest::new("tts-1", "hello", Voice::Neutral))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_json_mode_gate_is_unsupported_operation() {
        let transport = Scripted::replying(Ok(RawResponse::Json(json!({}))));
        let dispatcher = ChatDispatcher::new(
            AnthropicProvider::new(ProviderConfig::new(ProviderType::Anthropic, "sk-ant")),
            transport.clone(),
        );
        let request = ChatRequest::new("claude", vec![Message::user("hi")])
            .with_response_format(ResponseFormat::Json);

        let err = dispatcher.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
        assert_eq!(err.provider, "anthropic");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_carries_auth_and_request_id() {
        let transport = Scripted::replying(Ok(RawResponse::Json(json!({
            "id": "c1",
            "model": "m1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 2, "completion_tokens": 3, "total_tokens": 5}
        }))));
        let dispatcher = openai(transport.clone());

        let response = dispatcher
            .complete(&ChatRequest::new("m1", vec![Message::user("hi")]).with_max_tokens(16))
            .await
            .unwrap();
        assert_eq!(response.text(), "hello");

        let seen = transport.seen.lock().unwrap();
        let sent = &seen[0];
        assert_eq!(sent.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(sent.headers["Authorization"], "Bearer sk-test");
        assert_eq!(sent.headers["Content-Type"], "application/json");
        assert_eq!(sent.expect, ResponseShape::Json);
        assert_eq!(sent.body.as_ref().unwrap()["max_tokens"], 16);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_mapped() {
        let transport = Scripted::replying(Ok(RawResponse::Json(json!({"object": "chat.completion"}))));
        let err = openai(transport)
            .complete(&ChatRequest::new("m1", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Provider);
        assert_eq!(err.code.as_deref(), Some("decode"));
        assert_eq!(err.raw, Some(json!({"object": "chat.completion"})));
    }

    #[tokio::test]
    async fn test_status_error_goes_through_map_error() {
        let transport = Scripted::replying(Err(TransportError::Status {
            status: 429,
            body: json!({"error": {"message": "slow down", "type": "requests", "code": "rate_limit_exceeded"}}),
            retry_after: None,
        }));
        let err = openai(transport)
            .complete(&ChatRequest::new("m1", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::RateLimit);
        assert_eq!(err.message, "slow down");
    }

    #[tokio::test]
    async fn test_stream_stops_after_done() {
        let transport = Scripted::streaming(vec![
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "hel"}}]})),
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "lo"}, "finish_reason": "stop"}]})),
            Ok(json!({"id": "s1", "model": "m1", "choices": [], "usage": {"prompt_tokens": 2, "completion_tokens": 3, "total_tokens": 5}})),
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "late"}}]})),
        ]);
        let dispatcher = openai(transport.clone());

        let chunks: Vec<_> = dispatcher
            .stream(&ChatRequest::new("m1", vec![Message::user("hi")]))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(chunks.len(), 3);
        assert!(chunks[2].as_ref().unwrap().done);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].expect, ResponseShape::EventStream);
        assert_eq!(seen[0].body.as_ref().unwrap()["stream"], true);
    }

    #[test]
    fn test_dropped_stream_keeps_delivered_chunks() {
        let transport = Scripted::streaming(vec![
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "kept"}}]})),
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "never read"}}]})),
        ]);

        let first = tokio_test::block_on(async {
            let mut chunks = openai(transport)
                .stream(&ChatRequest::new("m1", vec![Message::user("hi")]))
                .await
                .unwrap();
            chunks.next().await.unwrap().unwrap()
        });

        let partial = crate::stream::StreamReconstructor::reconstruct("openai", vec![first]).unwrap();
        assert_eq!(partial.text(), "kept");
    }

    #[tokio::test]
    async fn test_stream_error_ends_stream() {
        let transport = Scripted::streaming(vec![
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "a"}}]})),
            Err(TransportError::Stream("connection reset".into())),
            Ok(json!({"id": "s1", "model": "m1", "choices": [{"index": 0, "delta": {"content": "b"}}]})),
        ]);

        let chunks: Vec<_> = openai(transport)
            .stream(&ChatRequest::new("m1", vec![Message::user("hi")]))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert_eq!(chunks[1].as_ref().unwrap_err().code.as_deref(), Some("stream"));
    }
}
