//! HTTP transport implementation using reqwest

use super::error::{body_to_value, parse_retry_after, TransportError};
use super::{HttpMethod, HttpRequest, RawResponse, RawStream, ResponseShape, Transport};
use crate::config::HttpSettings;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default user agent
const USER_AGENT: &str = concat!("unillm/", env!("CARGO_PKG_VERSION"));

/// Terminal sentinel some vendors send as the last event payload
const DONE_SENTINEL: &str = "[DONE]";

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::with_settings(&HttpSettings::default())
    }

    /// Create a client from connection settings
    pub fn with_settings(settings: &HttpSettings) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(settings.max_idle_per_host)
            .pool_idle_timeout(settings.keepalive())
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: settings.max_response_size,
        })
    }

    fn build(&self, request: &HttpRequest) -> RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder = builder
            .header(ACCEPT, request.expect.accept_header())
            .header("X-Request-ID", request.request_id.to_string());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    /// Send and turn non-success statuses into [`TransportError::Status`]
    async fn execute(&self, request: &HttpRequest) -> Result<Response, TransportError> {
        let request_id = request.request_id;
        debug!(url = %request.url, %request_id, "sending request");

        let response = self.build(request).send().await.map_err(|e| {
            warn!(%request_id, error = %e, "request failed without response");
            TransportError::NoResponse {
                message: e.to_string(),
                timed_out: e.is_timeout(),
            }
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), %request_id, "response received");

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();

        warn!(status = status.as_u16(), %request_id, "provider returned error status");
        Err(TransportError::Status {
            status: status.as_u16(),
            body: body_to_value(&body),
            retry_after,
        })
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> Result<(), TransportError> {
        match response.content_length() {
            Some(len) if len as usize > self.max_response_size => Err(TransportError::Decode {
                message: format!(
                    "Response size {} exceeds maximum {}",
                    len, self.max_response_size
                ),
                body: None,
            }),
            _ => Ok(()),
        }
    }

    /// Validate response content type
    fn validate_content_type(response: &Response) -> Result<(), TransportError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_lowercase);

        match content_type {
            Some(ct) if !ct.contains("json") => Err(TransportError::Decode {
                message: format!("Expected application/json, got: {}", ct),
                body: None,
            }),
            _ => Ok(()),
        }
    }

    async fn read_body(&self, response: Response) -> Result<Vec<u8>, TransportError> {
        self.check_content_length(&response)?;
        let bytes = response.bytes().await.map_err(|e| TransportError::NoResponse {
            message: format!("Failed to read response body: {}", e),
            timed_out: e.is_timeout(),
        })?;
        if bytes.len() > self.max_response_size {
            return Err(TransportError::Decode {
                message: format!(
                    "Response size {} exceeds maximum {}",
                    bytes.len(),
                    self.max_response_size
                ),
                body: None,
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let response = self.execute(&request).await?;

        match request.expect {
            ResponseShape::Bytes => Ok(RawResponse::Bytes(self.read_body(response).await?)),
            ResponseShape::Json | ResponseShape::EventStream => {
                Self::validate_content_type(&response)?;
                let bytes = self.read_body(response).await?;
                serde_json::from_slice::<Value>(&bytes)
                    .map(RawResponse::Json)
                    .map_err(|e| TransportError::Decode {
                        message: format!("Invalid JSON body: {}", e),
                        body: Some(body_to_value(&String::from_utf8_lossy(&bytes))),
                    })
            }
        }
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<RawStream, TransportError> {
        let response = self.execute(&request).await?;
        let request_id = request.request_id;

        let events = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                future::ready(!matches!(event, Ok(e) if e.data.trim() == DONE_SENTINEL))
            })
            .filter_map(move |event| async move {
                match event {
                    Ok(e) if e.data.trim().is_empty() => None,
                    Ok(e) => Some(serde_json::from_str::<Value>(&e.data).map_err(|err| {
                        TransportError::Decode {
                            message: format!("Invalid event payload: {}", err),
                            body: Some(Value::String(e.data.clone())),
                        }
                    })),
                    Err(e) => {
                        warn!(%request_id, error = %e, "event stream interrupted");
                        Some(Err(TransportError::Stream(e.to_string())))
                    }
                }
            });

        Ok(events.boxed())
    }
}
