//! Conversion between the universal model and the Anthropic Messages API

use super::types::*;
use crate::error::{LlmError, LlmResult};
use crate::protocol::{
    ChatRequest, ChatResponse, ContentPart, FinishReason, FunctionCall, MediaLocation, MediaSource,
    Message, MessageRole, ResponseMetadata, Usage,
};
use serde_json::Value;

pub(crate) const PROVIDER: &str = "anthropic";

/// Used when the request leaves `max_tokens` unset
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub fn to_anthropic_request(request: &ChatRequest) -> LlmResult<AnthropicRequest> {
    let config = &request.config;

    let system: Vec<String> = request
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(Message::text)
        .collect();

    let mut messages: Vec<AnthropicMessage> = Vec::new();
    for message in request.messages.iter().filter(|m| m.role != MessageRole::System) {
        let (role, blocks) = convert_message(message)?;

        // Consecutive user turns collapse, so tool results join the following or preceding user text
        if let Some(last) = messages.last_mut() {
            if role == "user" && last.role == "user" {
                last.content.extend(blocks);
                continue;
            }
        }
        messages.push(AnthropicMessage {
            role: role.to_string(),
            content: blocks,
        });
    }

    Ok(AnthropicRequest {
        model: request.model.clone(),
        max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages,
        temperature: config.temperature,
        top_p: config.top_p,
        top_k: config.top_k,
        stop_sequences: config.stop.clone(),
        stream: config.stream.then_some(true),
        tools: config.functions.as_ref().filter(|f| !f.is_empty()).map(|functions| {
            functions
                .iter()
                .map(|f| AnthropicTool {
                    name: f.name.clone(),
                    description: f.description.clone(),
                    input_schema: f.parameters.to_schema(),
                })
                .collect()
        }),
    })
}

fn convert_message(message: &Message) -> LlmResult<(&'static str, Vec<AnthropicContentBlock>)> {
    match message.role {
        MessageRole::Function => {
            let call = message.function_call.as_ref().ok_or_else(|| {
                LlmError::validation(PROVIDER, vec!["function message without function_call".into()])
            })?;
            let content = match &call.response {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Ok((
                "user",
                vec![AnthropicContentBlock::ToolResult {
                    tool_use_id: call.call_id(),
                    content,
                }],
            ))
        }
        MessageRole::Assistant => {
            let mut blocks = convert_parts(&message.content)?;
            if let Some(call) = &message.function_call {
                blocks.push(AnthropicContentBlock::ToolUse {
                    id: call.call_id(),
                    name: call.name.clone(),
                    input: Value::Object(call.arguments.clone()),
                });
            }
            Ok(("assistant", blocks))
        }
        MessageRole::User | MessageRole::System => Ok(("user", convert_parts(&message.content)?)),
    }
}

fn convert_parts(parts: &[ContentPart]) -> LlmResult<Vec<AnthropicContentBlock>> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(AnthropicContentBlock::Text { text: text.clone() }),
            ContentPart::Image { source } => Ok(AnthropicContentBlock::Image {
                source: convert_source(source)?,
            }),
            ContentPart::Pdf { source } => Ok(AnthropicContentBlock::Document {
                source: convert_source(source)?,
            }),
            other => Err(LlmError::validation(
                PROVIDER,
                vec![format!(
                    "unsupported content type {} for {PROVIDER}",
                    other.content_type().as_str()
                )],
            )),
        })
        .collect()
}

fn convert_source(source: &MediaSource) -> LlmResult<AnthropicSource> {
    match source.location() {
        Some(MediaLocation::Inline(data)) => Ok(AnthropicSource {
            source_type: "base64".to_string(),
            media_type: Some(source.mime_type.clone()),
            data: Some(data.to_string()),
            url: None,
        }),
        Some(MediaLocation::Url(url)) => Ok(AnthropicSource {
            source_type: "url".to_string(),
            media_type: None,
            data: None,
            url: Some(url.to_string()),
        }),
        _ => Err(LlmError::validation(
            PROVIDER,
            vec!["media source must be inline data or a URL".into()],
        )),
    }
}

pub fn from_anthropic_response(
    response: AnthropicResponse,
    _request: &ChatRequest,
) -> LlmResult<ChatResponse> {
    let raw = serde_json::to_value(&response).ok();

    let mut content = Vec::new();
    let mut calls = Vec::new();
    for block in response.content {
        match block {
            AnthropicResponseBlock::Text { text } => content.push(ContentPart::text(text)),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                let arguments = match input {
                    Value::Object(map) => map,
                    Value::Null => serde_json::Map::new(),
                    other => {
                        return Err(LlmError::validation(
                            PROVIDER,
                            vec![format!("tool_use input must be a JSON object, got {}", other)],
                        ))
                    }
                };
                calls.push(FunctionCall::new(name, arguments).with_id(id));
            }
            AnthropicResponseBlock::Unknown => {}
        }
    }

    Ok(ChatResponse {
        id: response.id,
        content,
        function_calls: (!calls.is_empty()).then_some(calls),
        metadata: ResponseMetadata {
            model: response.model,
            usage: response.usage.as_ref().map(to_usage),
            finish_reason: response.stop_reason.as_deref().map(map_stop_reason),
            raw_response: raw,
        },
    })
}

pub(crate) fn to_usage(usage: &AnthropicUsage) -> Usage {
    Usage::tokens(usage.input_tokens, usage.output_tokens, None)
}

pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::FunctionCall,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Function, FunctionParameter};
    use serde_json::{json, Map};

    #[test]
    fn test_system_lifted_and_max_tokens_defaulted() {
        let request = ChatRequest::new(
            "claude-3-5-sonnet",
            vec![
                Message::system("Be brief."),
                Message::system("Answer in French."),
                Message::user("hi"),
            ],
        );
        let native = serde_json::to_value(to_anthropic_request(&request).unwrap()).unwrap();

        assert_eq!(
            native,
            json!({
                "model": "claude-3-5-sonnet",
                "max_tokens": 4096,
                "system": "Be brief.\n\nAnswer in French.",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })
        );
    }

    #[test]
    fn test_tool_round_trip_shapes() {
        let mut args = Map::new();
        args.insert("city".into(), json!("Oslo"));
        let call = FunctionCall::new("weather", args).with_id("toolu_1");

        let request = ChatRequest::new(
            "claude",
            vec![
                Message::user("weather in Oslo?"),
                Message::function_call(call.clone()),
                Message::function_result(call.with_response(json!({"temp": -3}))),
                Message::user("and tomorrow?"),
            ],
        )
        .with_functions(vec![Function::new("weather", FunctionParameter::object())
            .with_description("Current weather")]);

        let native = serde_json::to_value(to_anthropic_request(&request).unwrap()).unwrap();
        let messages = native["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1]["content"][0],
            json!({"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {"city": "Oslo"}})
        );
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(
            messages[2]["content"][0],
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "{\"temp\":-3}"})
        );
        assert_eq!(messages[2]["content"][1]["text"], "and tomorrow?");
        assert_eq!(native["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_pdf_becomes_document_block() {
        let message = Message::user("summarize")
            .with_part(ContentPart::pdf(MediaSource::base64("application/pdf", "JVBERi0")));
        let (_, blocks) = convert_message(&message).unwrap();
        assert_eq!(
            serde_json::to_value(&blocks[1]).unwrap(),
            json!({
                "type": "document",
                "source": {"type": "base64", "media_type": "application/pdf", "data": "JVBERi0"}
            })
        );
    }

    #[test]
    fn test_response_with_tool_use() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude",
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {"city": "Oslo"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }))
        .unwrap();

        let request = ChatRequest::new("claude", vec![Message::user("hi")]);
        let out = from_anthropic_response(response, &request).unwrap();

        assert_eq!(out.text(), "Checking.");
        let calls = out.function_calls.unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("toolu_1"));
        assert_eq!(calls[0].arguments["city"], "Oslo");
        assert_eq!(out.metadata.finish_reason, Some(FinishReason::FunctionCall));
        assert_eq!(out.metadata.usage.unwrap().total_tokens, Some(14));
    }
}
