//! Streaming chunk conversion for OpenAI responses
//!
//! With `stream_options.include_usage` set, OpenAI finishes a stream with a
//! chunk that has no choices and carries the usage totals. That chunk is the
//! terminal event; the earlier chunk carrying `finish_reason` is not.

use super::converter::{map_finish_reason, to_usage};
use super::types::{OpenAIDelta, OpenAIStreamChunk};
use crate::error::LlmResult;
use crate::protocol::{
    ChatRequest, ChatStreamResponse, FunctionCallDelta, ResponseMetadata, StreamDelta,
};

/// Convert one OpenAI stream chunk
pub fn from_openai_stream_chunk(
    chunk: OpenAIStreamChunk,
    request: &ChatRequest,
) -> LlmResult<ChatStreamResponse> {
    let usage = chunk.usage.as_ref().map(to_usage);
    let done = usage.is_some();
    let model = if chunk.model.is_empty() {
        request.model.clone()
    } else {
        chunk.model
    };

    // Only the first choice is surfaced; n > 1 is never requested
    let (delta, finish_reason) = match chunk.choices.into_iter().next() {
        Some(choice) => (
            convert_delta(choice.delta),
            choice.finish_reason.as_deref().map(map_finish_reason),
        ),
        None => (None, None),
    };

    let mut out = ChatStreamResponse::new(chunk.id, delta);
    if usage.is_some() || finish_reason.is_some() {
        out = out.with_metadata(ResponseMetadata {
            model,
            usage,
            finish_reason,
            raw_response: None,
        });
    }
    if done {
        out = out.finished();
    }
    Ok(out)
}

fn convert_delta(delta: OpenAIDelta) -> Option<StreamDelta> {
    if let Some(tool_call) = delta.tool_calls.and_then(|calls| calls.into_iter().next()) {
        let function = tool_call.function.unwrap_or_default();
        return Some(StreamDelta::FunctionCall {
            index: tool_call.index,
            call: FunctionCallDelta {
                id: tool_call.id,
                name: function.name,
                arguments: function.arguments,
            },
        });
    }

    if let Some(legacy) = delta.function_call {
        return Some(StreamDelta::FunctionCall {
            index: 0,
            call: FunctionCallDelta {
                id: None,
                name: legacy.name,
                arguments: legacy.arguments,
            },
        });
    }

    delta
        .content
        .filter(|text| !text.is_empty())
        .map(|text| StreamDelta::text(0, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FinishReason, Message};
    use serde_json::json;

    fn chunk(value: serde_json::Value) -> OpenAIStreamChunk {
        serde_json::from_value(value).unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest::new("m1", vec![Message::user("hi")]).with_stream(true)
    }

    #[test]
    fn test_text_delta() {
        let out = from_openai_stream_chunk(
            chunk(json!({
                "id": "c1", "model": "m1",
                "choices": [{"index": 0, "delta": {"role": "assistant", "content": "hel"}}]
            })),
            &request(),
        )
        .unwrap();

        assert_eq!(out.delta, Some(StreamDelta::text(0, "hel")));
        assert!(out.metadata.is_none());
        assert!(!out.done);
    }

    #[test]
    fn test_finish_reason_is_not_terminal() {
        let out = from_openai_stream_chunk(
            chunk(json!({
                "id": "c1", "model": "m1",
                "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
            })),
            &request(),
        )
        .unwrap();

        assert_eq!(out.delta, None);
        assert_eq!(out.metadata.unwrap().finish_reason, Some(FinishReason::Stop));
        assert!(!out.done);
    }

    #[test]
    fn test_usage_chunk_is_terminal() {
        let out = from_openai_stream_chunk(
            chunk(json!({
                "id": "c1", "model": "m1", "choices": [],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
            })),
            &request(),
        )
        .unwrap();

        assert!(out.done);
        assert_eq!(out.metadata.unwrap().usage.unwrap().total_tokens, Some(5));
    }

    #[test]
    fn test_tool_call_fragment() {
        let out = from_openai_stream_chunk(
            chunk(json!({
                "id": "c1",
                "choices": [{"index": 0, "delta": {"tool_calls": [{
                    "index": 1, "id": "call_9", "type": "function",
                    "function": {"name": "lookup", "arguments": "{\"q\":"}
                }]}}]
            })),
            &request(),
        )
        .unwrap();

        assert_eq!(
            out.delta,
            Some(StreamDelta::FunctionCall {
                index: 1,
                call: FunctionCallDelta {
                    id: Some("call_9".into()),
                    name: Some("lookup".into()),
                    arguments: Some("{\"q\":".into()),
                },
            })
        );
    }
}
