//! Stream reconstruction
//!
//! Folds the ordered [`ChatStreamResponse`] chunks of one request into the
//! [`ChatResponse`] a non-streaming call would have produced:
//!
//! - text deltas are concatenated in arrival order per content index
//! - function-call fragments accumulate per index and are parsed when the
//!   stream is finished; a fragment whose id differs from the pending
//!   call's id at the same index starts a new call
//! - usage counters are merged, each keeping its most recent reported value
//! - any chunk after the terminal one is a protocol violation

use crate::error::{LlmError, LlmResult};
use crate::protocol::{
    ChatResponse, ChatStreamResponse, ContentPart, FinishReason, FunctionCall, FunctionCallDelta,
    ResponseMetadata, StreamDelta, Usage,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct PendingCall {
    index: usize,
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Accumulates stream chunks into a complete response
#[derive(Debug)]
pub struct StreamReconstructor {
    provider: String,
    id: Option<String>,
    content: BTreeMap<usize, ContentPart>,
    /// Arrival order; ordered by index on finish
    calls: Vec<PendingCall>,
    model: String,
    usage: Option<Usage>,
    finish_reason: Option<FinishReason>,
    chunks: usize,
    done: bool,
}

impl StreamReconstructor {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: None,
            content: BTreeMap::new(),
            calls: Vec::new(),
            model: String::new(),
            usage: None,
            finish_reason: None,
            chunks: 0,
            done: false,
        }
    }

    /// Fold a complete chunk sequence
    pub fn reconstruct<I>(provider: impl Into<String>, chunks: I) -> LlmResult<ChatResponse>
    where
        I: IntoIterator<Item = ChatStreamResponse>,
    {
        let mut reconstructor = Self::new(provider);
        for chunk in chunks {
            reconstructor.push(chunk)?;
        }
        reconstructor.finish()
    }

    /// Whether the terminal chunk has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, chunk: ChatStreamResponse) -> LlmResult<()> {
        if self.done {
            return Err(LlmError::provider(
                &self.provider,
                format!("received chunk {} after the terminal chunk", self.chunks + 1),
            )
            .with_code("chunk_after_done"));
        }
        self.chunks += 1;

        if self.id.is_none() && !chunk.id.is_empty() {
            self.id = Some(chunk.id);
        }

        match chunk.delta {
            Some(StreamDelta::Content { index, part }) => self.push_content(index, part),
            Some(StreamDelta::FunctionCall { index, call }) => {
                let pending = self.pending_call(index, &call);
                if pending.id.is_none() {
                    pending.id = call.id;
                }
                if let Some(name) = call.name.filter(|n| !n.is_empty()) {
                    if pending.name.is_empty() {
                        pending.name = name;
                    }
                }
                if let Some(fragment) = call.arguments {
                    pending.arguments.push_str(&fragment);
                }
            }
            None => {}
        }

        if let Some(metadata) = chunk.metadata {
            if !metadata.model.is_empty() {
                self.model = metadata.model;
            }
            if let Some(update) = metadata.usage.filter(|u| !u.is_empty()) {
                match &mut self.usage {
                    Some(usage) => usage.merge(update),
                    None => self.usage = Some(update),
                }
            }
            if metadata.finish_reason.is_some() {
                self.finish_reason = metadata.finish_reason;
            }
        }

        if chunk.done {
            debug!(provider = %self.provider, chunks = self.chunks, "stream reached terminal chunk");
            self.done = true;
        }
        Ok(())
    }

    /// Call the fragment belongs to, opening a new one when it starts another call
    fn pending_call(&mut self, index: usize, call: &FunctionCallDelta) -> &mut PendingCall {
        let current = self.calls.iter().rposition(|c| c.index == index);
        let starts_new = match current.map(|i| &self.calls[i]) {
            None => true,
            Some(pending) => matches!(
                (&pending.id, &call.id),
                (Some(known), Some(incoming)) if known != incoming
            ),
        };

        let slot = match current {
            Some(i) if !starts_new => i,
            _ => {
                self.calls.push(PendingCall {
                    index,
                    ..Default::default()
                });
                self.calls.len() - 1
            }
        };
        &mut self.calls[slot]
    }

    fn push_content(&mut self, index: usize, part: ContentPart) {
        match (self.content.get_mut(&index), part) {
            (Some(ContentPart::Text { text }), ContentPart::Text { text: fragment }) => {
                text.push_str(&fragment);
            }
            (_, part) => {
                self.content.insert(index, part);
            }
        }
    }

    /// Close pending function calls and build the response
    pub fn finish(mut self) -> LlmResult<ChatResponse> {
        // Stable: calls sharing an index keep arrival order
        self.calls.sort_by_key(|c| c.index);
        let mut calls = Vec::with_capacity(self.calls.len());
        for pending in self.calls {
            let index = pending.index;
            if pending.name.is_empty() {
                return Err(LlmError::validation(
                    &self.provider,
                    vec![format!("function call at index {index} has no name")],
                ));
            }
            let arguments = parse_arguments(&self.provider, index, &pending.arguments)?;
            let mut call = FunctionCall::new(pending.name, arguments);
            call.id = pending.id;
            calls.push(call);
        }

        Ok(ChatResponse {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            content: self.content.into_values().collect(),
            function_calls: (!calls.is_empty()).then_some(calls),
            metadata: ResponseMetadata {
                model: self.model,
                usage: self.usage,
                finish_reason: self.finish_reason,
                raw_response: None,
            },
        })
    }
}

fn parse_arguments(provider: &str, index: usize, raw: &str) -> LlmResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LlmError::validation(
            provider,
            vec![format!("function call at index {index}: arguments are not a JSON object")],
        )),
        Err(e) => Err(LlmError::validation(
            provider,
            vec![format!("function call at index {index}: invalid JSON arguments: {e}")],
        )
        .with_raw(Value::String(raw.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn text(id: &str, s: &str) -> ChatStreamResponse {
        ChatStreamResponse::new(id, Some(StreamDelta::text(0, s)))
    }

    fn call(index: usize, name: Option<&str>, args: &str) -> ChatStreamResponse {
        ChatStreamResponse::new(
            "",
            Some(StreamDelta::FunctionCall {
                index,
                call: FunctionCallDelta {
                    id: name.map(|n| format!("call_{n}")),
                    name: name.map(str::to_string),
                    arguments: Some(args.to_string()),
                },
            }),
        )
    }

    fn usage(total: u32) -> ChatStreamResponse {
        ChatStreamResponse::new("", None).with_metadata(ResponseMetadata {
            model: "m".into(),
            usage: Some(Usage::tokens(None, None, Some(total))),
            ..Default::default()
        })
    }

    #[test]
    fn test_concatenates_text_and_keeps_first_id() {
        let response = StreamReconstructor::reconstruct(
            "openai",
            vec![text("r1", "hel"), text("", "lo"), text("r2", "!"), usage(5).finished()],
        )
        .unwrap();

        assert_eq!(response.id, "r1");
        assert_eq!(response.text(), "hello!");
        assert_eq!(response.content.len(), 1);
        assert_eq!(response.function_calls, None);
    }

    #[test]
    fn test_last_usage_wins() {
        let response =
            StreamReconstructor::reconstruct("gemini", vec![usage(3), text("", "x"), usage(9).finished()])
                .unwrap();
        assert_eq!(response.usage().unwrap().total_tokens, Some(9));
        assert_eq!(response.metadata.model, "m");
    }

    #[test]
    fn test_accumulates_function_calls_per_index() {
        let response = StreamReconstructor::reconstruct(
            "openai",
            vec![
                call(0, Some("a"), "{\"x\":"),
                call(1, Some("b"), "{}"),
                call(0, None, "1}"),
                ChatStreamResponse::new("", None).finished(),
            ],
        )
        .unwrap();

        let calls = response.function_calls.unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "a");
        assert_eq!(calls[0].id.as_deref(), Some("call_a"));
        assert_eq!(calls[0].arguments["x"], 1);
        assert_eq!(calls[1].name, "b");
    }

    #[test]
    fn test_new_id_at_same_index_starts_new_call() {
        let response = StreamReconstructor::reconstruct(
            "gemini",
            vec![
                call(0, Some("a"), r#"{"x":1}"#),
                call(0, Some("b"), r#"{"y":2}"#),
                call(0, Some("a"), r#"{"x":3}"#),
                ChatStreamResponse::new("", None).finished(),
            ],
        )
        .unwrap();

        let calls = response.function_calls.unwrap();
        let seen: Vec<_> = calls.iter().map(|c| (c.name.as_str(), c.arguments.clone())).collect();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, "a");
        assert_eq!(seen[1].1["y"], 2);
        assert_eq!(seen[2].1["x"], 3);
    }

    #[test]
    fn test_usage_counters_are_merged() {
        let partial = |prompt, completion| {
            ChatStreamResponse::new("", None).with_metadata(ResponseMetadata {
                model: "m".into(),
                usage: Some(Usage::tokens(prompt, completion, None)),
                ..Default::default()
            })
        };
        let response = StreamReconstructor::reconstruct(
            "anthropic",
            vec![partial(Some(10), Some(1)), partial(None, Some(4)), ChatStreamResponse::new("", None).finished()],
        )
        .unwrap();

        assert_eq!(response.usage(), Some(&Usage::tokens(Some(10), Some(4), Some(14))));
    }

    #[test]
    fn test_chunk_after_done_is_provider_error() {
        let mut reconstructor = StreamReconstructor::new("anthropic");
        reconstructor.push(text("r", "a").finished()).unwrap();
        let err = reconstructor.push(ChatStreamResponse::new("", None).finished()).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Provider);
        assert_eq!(err.code.as_deref(), Some("chunk_after_done"));
        assert_eq!(reconstructor.finish().unwrap().text(), "a");
    }

    #[test]
    fn test_invalid_arguments_are_validation_error() {
        let err = StreamReconstructor::reconstruct("openai", vec![call(0, Some("a"), "{\"x\":")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
