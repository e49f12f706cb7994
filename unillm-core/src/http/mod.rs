//! Transport boundary between the dispatcher and the network
//!
//! The dispatcher hands a fully formed [`HttpRequest`] (URL, auth headers,
//! query parameters, native body) to a [`Transport`]. Connection pooling,
//! TLS and timeouts belong to the transport implementation; the default one
//! is [`client::HttpClient`].

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::{extract_error_details, ErrorDetails, TransportError};

use crate::config::redact_by_field_name;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Shape the caller expects the response body to have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A JSON document
    Json,
    /// Opaque bytes (audio)
    Bytes,
    /// A server-sent event stream of JSON documents
    EventStream,
}

impl ResponseShape {
    pub fn accept_header(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Bytes => "*/*",
            Self::EventStream => "text/event-stream",
        }
    }
}

/// A fully formed outbound request
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub expect: ResponseShape,

    /// Correlation id, sent as `X-Request-ID`
    pub request_id: Uuid,

    /// Per-request timeout overriding the transport default
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::new(),
            query: Vec::new(),
            body: Some(body),
            expect: ResponseShape::Json,
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn expecting(mut self, shape: ResponseShape) -> Self {
        self.expect = shape;
        self
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// Header and query values carry credentials
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: HashMap<&str, String> = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), redact_by_field_name(k, v)))
            .collect();
        let query: Vec<(&str, String)> = self
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), redact_by_field_name(k, v)))
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("query", &query)
            .field("expect", &self.expect)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Json(Value),
    Bytes(Vec<u8>),
}

/// Stream of decoded server-sent event payloads
pub type RawStream = BoxStream<'static, Result<Value, TransportError>>;

/// Outbound call collaborator
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return its decoded body
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;

    /// Execute a request whose response is a server-sent event stream
    async fn send_stream(&self, request: HttpRequest) -> Result<RawStream, TransportError>;
}
