//! Streaming conversion for Gemini
//!
//! Every `streamGenerateContent` event is a complete `GenerateContentResponse`
//! holding the next slice of the candidate. One event expands into a text
//! chunk followed by one chunk per function call. Calls arrive whole, so each
//! carries its full arguments and a generated id that keeps it apart from
//! calls in other events. The event whose candidate carries a finish reason
//! is terminal.

use super::converter::{function_args, map_finish_reason, select_candidate, to_usage};
use super::types::GeminiResponse;
use crate::error::LlmResult;
use crate::protocol::{
    ChatRequest, ChatStreamResponse, FinishReason, FunctionCallDelta, ResponseMetadata,
    StreamDelta,
};
use serde_json::Value;
use uuid::Uuid;

pub fn from_gemini_stream_chunk(
    chunk: GeminiResponse,
    request: &ChatRequest,
) -> LlmResult<Vec<ChatStreamResponse>> {
    let usage = chunk.usage_metadata.as_ref().map(to_usage);
    let model = chunk
        .model_version
        .clone()
        .unwrap_or_else(|| request.model.clone());
    let id = chunk.response_id.clone().unwrap_or_default();

    // Usage-only trailer
    if chunk.candidates.is_empty() && chunk.prompt_feedback.is_none() {
        let mut out = ChatStreamResponse::new(id, None);
        if usage.is_some() {
            out = out.with_metadata(ResponseMetadata {
                model,
                usage,
                ..Default::default()
            });
        }
        return Ok(vec![out]);
    }

    let candidate = select_candidate(&chunk)?;
    let parts: Vec<_> = candidate.content.iter().flat_map(|c| c.parts.iter()).collect();

    let mut deltas = Vec::new();
    let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    if !text.is_empty() {
        deltas.push(StreamDelta::text(0, text));
    }
    for call in parts.iter().filter_map(|p| p.function_call.as_ref()) {
        deltas.push(StreamDelta::FunctionCall {
            index: 0,
            call: FunctionCallDelta {
                id: Some(format!("call_{}", Uuid::new_v4().simple())),
                name: Some(call.name.clone()),
                arguments: Some(Value::Object(function_args(&call.args)?).to_string()),
            },
        });
    }
    let has_calls = deltas
        .iter()
        .any(|d| matches!(d, StreamDelta::FunctionCall { .. }));

    let finish_reason = candidate.finish_reason.as_deref().map(|reason| {
        if has_calls {
            FinishReason::FunctionCall
        } else {
            map_finish_reason(reason)
        }
    });
    let done = finish_reason.is_some();

    let mut out: Vec<_> = deltas
        .into_iter()
        .map(|delta| ChatStreamResponse::new(id.clone(), Some(delta)))
        .collect();

    // Metadata and the terminal flag ride on the last chunk of the event
    let mut last = out.pop().unwrap_or_else(|| ChatStreamResponse::new(id, None));
    if usage.is_some() || finish_reason.is_some() {
        last = last.with_metadata(ResponseMetadata {
            model,
            usage,
            finish_reason,
            raw_response: None,
        });
    }
    if done {
        last = last.finished();
    }
    out.push(last);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, LlmError};
    use crate::protocol::Message;
    use serde_json::json;

    fn convert(value: Value) -> Result<Vec<ChatStreamResponse>, LlmError> {
        let request = ChatRequest::new("gemini-1.5-flash", vec![Message::user("hi")]).with_stream(true);
        from_gemini_stream_chunk(serde_json::from_value(value).unwrap(), &request)
    }

    fn call_of(chunk: &ChatStreamResponse) -> &FunctionCallDelta {
        match &chunk.delta {
            Some(StreamDelta::FunctionCall { call, .. }) => call,
            other => panic!("expected a function call, got {:?}", other),
        }
    }

    #[test]
    fn test_text_slice() {
        let out = convert(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hel"}, {"text": "lo"}]}}],
            "usageMetadata": {"promptTokenCount": 4}
        }))
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].delta, Some(StreamDelta::text(0, "Hello")));
        assert!(!out[0].done);
        assert_eq!(out[0].metadata.as_ref().unwrap().usage.as_ref().unwrap().prompt_tokens, Some(4));
    }

    #[test]
    fn test_finish_reason_is_terminal() {
        let out = convert(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "!"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        }))
        .unwrap();
        assert!(out[0].done);
        let metadata = out[0].metadata.clone().unwrap();
        assert_eq!(metadata.finish_reason, Some(FinishReason::Stop));
        assert_eq!(metadata.usage.unwrap().total_tokens, Some(6));
    }

    #[test]
    fn test_function_call_is_one_fragment() {
        let out = convert(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"functionCall": {"name": "lookup", "args": {"q": "rust"}}}
            ]}, "finishReason": "STOP"}]
        }))
        .unwrap();
        assert_eq!(out.len(), 1);
        let call = call_of(&out[0]);
        assert_eq!(call.name.as_deref(), Some("lookup"));
        assert_eq!(call.arguments.as_deref(), Some(r#"{"q":"rust"}"#));
        assert!(call.id.as_deref().is_some_and(|id| id.starts_with("call_")));
        assert_eq!(out[0].metadata.as_ref().unwrap().finish_reason, Some(FinishReason::FunctionCall));
    }

    #[test]
    fn test_event_expands_into_text_and_every_call() {
        let out = convert(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "Let me check."},
                {"functionCall": {"name": "weather", "args": {"city": "Oslo"}}},
                {"functionCall": {"name": "weather", "args": {"city": "Bergen"}}}
            ]}, "finishReason": "STOP"}]
        }))
        .unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].delta, Some(StreamDelta::text(0, "Let me check.")));
        assert_ne!(call_of(&out[1]).id, call_of(&out[2]).id);
        assert!(out.iter().take(2).all(|c| !c.done && c.metadata.is_none()));
        assert!(out[2].done);
    }

    #[test]
    fn test_blocked_candidate_is_error() {
        let err = convert(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Provider);
        assert_eq!(err.code.as_deref(), Some("SAFETY"));
    }
}
