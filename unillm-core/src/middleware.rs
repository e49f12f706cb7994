//! Request logging middleware
//!
//! A [`RequestLogger`] is created before a dispatch starts and dropped when it
//! ends. Dropping it emits exactly one event: completed, failed, or
//! cancelled when neither outcome was recorded (a dropped future or stream).

use crate::config::{mask_sensitive_fields, LoggingSettings};
use crate::error::LlmError;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Operation being dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ChatCompletion,
    ChatStream,
    Embedding,
    Speech,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatCompletion => "chat_completion",
            Self::ChatStream => "chat_stream",
            Self::Embedding => "embedding",
            Self::Speech => "speech",
        }
    }
}

/// Dispatch pipeline stage, recorded so failures name where they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Validating,
    Converting,
    Transporting,
    ConvertingBack,
    Streaming,
}

impl DispatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Converting => "converting",
            Self::Transporting => "transporting",
            Self::ConvertingBack => "converting_back",
            Self::Streaming => "streaming",
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Pending,
    Completed,
    Failed { kind: &'static str, message: String },
}

/// Scoped logging guard for one dispatched request
#[derive(Debug)]
pub struct RequestLogger {
    provider: &'static str,
    operation: Operation,
    request_id: Uuid,
    started: Instant,
    stage: DispatchStage,
    outcome: Outcome,
    settings: LoggingSettings,
}

impl RequestLogger {
    pub fn start(provider: &'static str, operation: Operation, settings: LoggingSettings) -> Self {
        let request_id = Uuid::new_v4();
        info!(
            provider,
            operation = operation.as_str(),
            %request_id,
            "request started"
        );

        Self {
            provider,
            operation,
            request_id,
            started: Instant::now(),
            stage: DispatchStage::Validating,
            outcome: Outcome::Pending,
            settings,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn stage(&self) -> DispatchStage {
        self.stage
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn enter(&mut self, stage: DispatchStage) {
        self.stage = stage;
    }

    /// Log the native request payload when enabled
    pub fn log_request<T: Serialize + ?Sized>(&self, payload: &T) {
        if self.settings.log_requests {
            debug!(
                provider = self.provider,
                request_id = %self.request_id,
                payload = %self.prepare(payload),
                "outbound request"
            );
        }
    }

    /// Log the normalized response when enabled
    pub fn log_response<T: Serialize + ?Sized>(&self, payload: &T) {
        if self.settings.log_responses {
            debug!(
                provider = self.provider,
                request_id = %self.request_id,
                payload = %self.prepare(payload),
                "normalized response"
            );
        }
    }

    fn prepare<T: Serialize + ?Sized>(&self, payload: &T) -> Value {
        let value = serde_json::to_value(payload).unwrap_or(Value::Null);
        if self.settings.mask_sensitive {
            mask_sensitive_fields(&value)
        } else {
            value
        }
    }

    pub fn complete(&mut self) {
        self.outcome = Outcome::Completed;
    }

    pub fn fail(&mut self, err: &LlmError) {
        self.outcome = Outcome::Failed {
            kind: err.kind.as_str(),
            message: err.message.clone(),
        };
    }
}

impl Drop for RequestLogger {
    fn drop(&mut self) {
        let duration_ms = self.started.elapsed().as_millis() as u64;
        let operation = self.operation.as_str();
        let stage = self.stage.as_str();

        match &self.outcome {
            Outcome::Completed => info!(
                provider = self.provider,
                operation,
                request_id = %self.request_id,
                duration_ms,
                "request completed"
            ),
            Outcome::Failed { kind, message } => error!(
                provider = self.provider,
                operation,
                request_id = %self.request_id,
                duration_ms,
                stage,
                error_kind = *kind,
                error = %message,
                "request failed"
            ),
            Outcome::Pending => warn!(
                provider = self.provider,
                operation,
                request_id = %self.request_id,
                duration_ms,
                stage,
                "request cancelled"
            ),
        }
    }
}
