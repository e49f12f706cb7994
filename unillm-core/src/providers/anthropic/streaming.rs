//! Streaming event conversion for Anthropic
//!
//! Only `message_start` carries the message id; later events leave it empty.
//! `message_stop` is the terminal event.

use super::converter::{map_stop_reason, to_usage, PROVIDER};
use super::provider::classify_error_type;
use super::types::*;
use crate::error::{LlmError, LlmResult};
use crate::protocol::{
    ChatRequest, ChatStreamResponse, FunctionCallDelta, ResponseMetadata, StreamDelta,
};
use serde_json::Value;

pub fn from_anthropic_stream_event(
    event: AnthropicStreamEvent,
    request: &ChatRequest,
) -> LlmResult<ChatStreamResponse> {
    let out = match event {
        AnthropicStreamEvent::MessageStart { message } => {
            let model = if message.model.is_empty() {
                request.model.clone()
            } else {
                message.model
            };
            ChatStreamResponse::new(message.id, None).with_metadata(ResponseMetadata {
                model,
                usage: message.usage.as_ref().map(to_usage),
                ..Default::default()
            })
        }
        AnthropicStreamEvent::ContentBlockStart {
            index,
            content_block,
        } => {
            let delta = match content_block {
                AnthropicStreamBlock::Text { text } if !text.is_empty() => {
                    Some(StreamDelta::text(index, text))
                }
                AnthropicStreamBlock::ToolUse { id, name } => Some(StreamDelta::FunctionCall {
                    index,
                    call: FunctionCallDelta {
                        id: Some(id),
                        name: Some(name),
                        arguments: None,
                    },
                }),
                _ => None,
            };
            ChatStreamResponse::new("", delta)
        }
        AnthropicStreamEvent::ContentBlockDelta { index, delta } => {
            let delta = match delta {
                AnthropicStreamDelta::TextDelta { text } => Some(StreamDelta::text(index, text)),
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    Some(StreamDelta::FunctionCall {
                        index,
                        call: FunctionCallDelta {
                            arguments: Some(partial_json),
                            ..Default::default()
                        },
                    })
                }
                AnthropicStreamDelta::Unknown => None,
            };
            ChatStreamResponse::new("", delta)
        }
        AnthropicStreamEvent::MessageDelta { delta, usage } => {
            ChatStreamResponse::new("", None).with_metadata(ResponseMetadata {
                model: request.model.clone(),
                usage: usage.as_ref().map(to_usage),
                finish_reason: delta.stop_reason.as_deref().map(map_stop_reason),
                raw_response: None,
            })
        }
        AnthropicStreamEvent::MessageStop => ChatStreamResponse::new("", None).finished(),
        AnthropicStreamEvent::Error { error } => return Err(stream_error(error)),
        AnthropicStreamEvent::ContentBlockStop { .. }
        | AnthropicStreamEvent::Ping
        | AnthropicStreamEvent::Unknown => ChatStreamResponse::new("", None),
    };
    Ok(out)
}

/// Errors delivered in-band once the stream has started (e.g. overloaded)
fn stream_error(error: Value) -> LlmError {
    let error_type = error.get("type").and_then(Value::as_str).unwrap_or("api_error");
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("stream error event");
    let kind = classify_error_type(error_type, message);

    LlmError::new(kind, PROVIDER, message)
        .with_code(error_type)
        .with_raw(error.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::protocol::{FinishReason, Message};
    use serde_json::json;

    fn convert(value: serde_json::Value) -> LlmResult<ChatStreamResponse> {
        let request = ChatRequest::new("claude", vec![Message::user("hi")]).with_stream(true);
        from_anthropic_stream_event(serde_json::from_value(value).unwrap(), &request)
    }

    #[test]
    fn test_message_start_carries_id() {
        let out = convert(json!({
            "type": "message_start",
            "message": {"id": "msg_1", "type": "message", "role": "assistant", "model": "claude-3",
                        "content": [], "usage": {"input_tokens": 12, "output_tokens": 1}}
        }))
        .unwrap();
        assert_eq!(out.id, "msg_1");
        assert_eq!(out.delta, None);
        assert_eq!(out.metadata.unwrap().usage.unwrap().prompt_tokens, Some(12));
    }

    #[test]
    fn test_tool_use_start_and_json_delta() {
        let start = convert(json!({
            "type": "content_block_start", "index": 1,
            "content_block": {"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {}}
        }))
        .unwrap();
        assert!(matches!(
            start.delta,
            Some(StreamDelta::FunctionCall { index: 1, ref call }) if call.name.as_deref() == Some("weather")
        ));

        let delta = convert(json!({
            "type": "content_block_delta", "index": 1,
            "delta": {"type": "input_json_delta", "partial_json": "{\"city\":"}
        }))
        .unwrap();
        assert_eq!(
            delta.delta,
            Some(StreamDelta::FunctionCall {
                index: 1,
                call: FunctionCallDelta {
                    arguments: Some("{\"city\":".into()),
                    ..Default::default()
                }
            })
        );
    }

    #[test]
    fn test_message_delta_and_stop() {
        let delta = convert(json!({
            "type": "message_delta",
            "delta": {"stop_reason": "end_turn", "stop_sequence": null},
            "usage": {"output_tokens": 15}
        }))
        .unwrap();
        let metadata = delta.metadata.unwrap();
        assert_eq!(metadata.finish_reason, Some(FinishReason::Stop));
        assert_eq!(metadata.usage.unwrap().completion_tokens, Some(15));
        assert!(!delta.done);

        assert!(convert(json!({"type": "message_stop"})).unwrap().done);
    }

    #[test]
    fn test_ping_and_unknown_events_are_empty() {
        for event in [json!({"type": "ping"}), json!({"type": "content_block_stop", "index": 0}), json!({"type": "future_event"})] {
            let out = convert(event).unwrap();
            assert_eq!(out.delta, None);
            assert!(!out.done);
        }
    }

    #[test]
    fn test_error_event() {
        let err = convert(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Provider);
        assert_eq!(err.code.as_deref(), Some("overloaded_error"));
    }
}
