//! Conversion between the universal model and OpenAI format

use super::types::*;
use crate::error::{LlmError, LlmResult};
use crate::protocol::{
    ChatRequest, ChatResponse, ContentPart, FinishReason, Function, FunctionCall, MediaLocation,
    Message, MessageRole, ResponseFormat, ResponseMetadata, Usage,
};
use serde_json::{json, Map, Value};

pub(crate) const PROVIDER: &str = "openai";

/// Convert a ChatRequest to OpenAI format
pub fn to_openai_request(request: &ChatRequest) -> LlmResult<OpenAIRequest> {
    let config = &request.config;
    let messages = request
        .messages
        .iter()
        .map(to_openai_message)
        .collect::<LlmResult<Vec<_>>>()?;

    let tools = config
        .functions
        .as_ref()
        .filter(|f| !f.is_empty())
        .map(|functions| functions.iter().map(to_openai_tool).collect());

    Ok(OpenAIRequest {
        model: request.model.clone(),
        messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        top_p: config.top_p,
        stop: config.stop.clone(),
        stream: config.stream.then_some(true),
        stream_options: config
            .stream
            .then_some(OpenAIStreamOptions { include_usage: true }),
        response_format: match config.response_format {
            ResponseFormat::Json => Some(OpenAIResponseFormat {
                format_type: "json_object".to_string(),
            }),
            ResponseFormat::Text => None,
        },
        tools,
        tool_choice: config.force_function.as_ref().map(|name| {
            json!({
                "type": "function",
                "function": { "name": name }
            })
        }),
    })
}

/// Convert a Message to OpenAI format
fn to_openai_message(message: &Message) -> LlmResult<OpenAIMessage> {
    match message.role {
        MessageRole::System => Ok(OpenAIMessage::new(
            "system",
            Some(OpenAIContent::Text(message.text())),
        )),
        MessageRole::User => {
            let mut out = OpenAIMessage::new("user", Some(to_openai_content(&message.content)?));
            out.name = message.name.clone();
            Ok(out)
        }
        MessageRole::Assistant => {
            let content = if message.content.is_empty() {
                None
            } else {
                Some(to_openai_content(&message.content)?)
            };
            let mut out = OpenAIMessage::new("assistant", content);
            out.tool_calls = message
                .function_call
                .as_ref()
                .map(|call| vec![to_openai_tool_call(call)]);
            Ok(out)
        }
        MessageRole::Function => {
            let call = message.function_call.as_ref().ok_or_else(|| {
                LlmError::validation(PROVIDER, vec!["function message without function_call".into()])
            })?;
            let result = match &call.response {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let mut out = OpenAIMessage::new("tool", Some(OpenAIContent::Text(result)));
            out.tool_call_id = Some(call.call_id());
            Ok(out)
        }
    }
}

/// Single text part becomes a plain string; anything else becomes typed parts
fn to_openai_content(parts: &[ContentPart]) -> LlmResult<OpenAIContent> {
    if let [ContentPart::Text { text }] = parts {
        return Ok(OpenAIContent::Text(text.clone()));
    }

    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(OpenAIContentPart::Text { text: text.clone() }),
            ContentPart::Image { source } => {
                let url = match source.location() {
                    Some(MediaLocation::Url(url)) => url.to_string(),
                    Some(MediaLocation::Inline(data)) => {
                        format!("data:{};base64,{}", source.mime_type, data)
                    }
                    _ => {
                        return Err(LlmError::validation(
                            PROVIDER,
                            vec!["image source must be inline data or a URL".into()],
                        ))
                    }
                };
                Ok(OpenAIContentPart::ImageUrl {
                    image_url: OpenAIImageUrl { url, detail: None },
                })
            }
            other => Err(LlmError::validation(
                PROVIDER,
                vec![format!(
                    "unsupported content type {} for {PROVIDER}",
                    other.content_type().as_str()
                )],
            )),
        })
        .collect::<LlmResult<Vec<_>>>()
        .map(OpenAIContent::Parts)
}

fn to_openai_tool_call(call: &FunctionCall) -> OpenAIToolCall {
    OpenAIToolCall {
        id: call.call_id(),
        tool_type: "function".to_string(),
        function: OpenAIFunctionCall {
            name: call.name.clone(),
            arguments: Value::Object(call.arguments.clone()).to_string(),
        },
    }
}

fn to_openai_tool(function: &Function) -> OpenAITool {
    OpenAITool {
        tool_type: "function".to_string(),
        function: OpenAIFunction {
            name: function.name.clone(),
            description: function.description.clone(),
            parameters: function.parameters.to_schema(),
        },
    }
}

/// Convert an OpenAI response to a ChatResponse
pub fn from_openai_response(
    response: OpenAIResponse,
    _request: &ChatRequest,
) -> LlmResult<ChatResponse> {
    let raw = serde_json::to_value(&response).ok();
    let usage = response.usage.as_ref().map(to_usage);

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::provider(PROVIDER, "response contained no choices"))?;
    let message = choice.message;

    let content = match message.content {
        Some(OpenAIContent::Text(text)) if !text.is_empty() => vec![ContentPart::text(text)],
        Some(OpenAIContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|part| match part {
                OpenAIContentPart::Text { text } => Some(ContentPart::text(text)),
                OpenAIContentPart::ImageUrl { .. } => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut calls = Vec::new();
    for tool_call in message.tool_calls.into_iter().flatten() {
        calls.push(
            FunctionCall::new(
                tool_call.function.name,
                parse_arguments(&tool_call.function.arguments)?,
            )
            .with_id(tool_call.id),
        );
    }
    if let Some(legacy) = message.function_call {
        calls.push(FunctionCall::new(legacy.name, parse_arguments(&legacy.arguments)?));
    }

    Ok(ChatResponse {
        id: response.id,
        content,
        function_calls: (!calls.is_empty()).then_some(calls),
        metadata: ResponseMetadata {
            model: response.model,
            usage,
            finish_reason: choice.finish_reason.as_deref().map(map_finish_reason),
            raw_response: raw,
        },
    })
}

/// Parse a vendor-embedded JSON arguments string into an object
pub fn parse_arguments(arguments: &str) -> LlmResult<Map<String, Value>> {
    if arguments.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(LlmError::validation(
            PROVIDER,
            vec![format!("function arguments must be a JSON object, got {}", other)],
        )),
        Err(e) => Err(LlmError::validation(
            PROVIDER,
            vec![format!("function arguments are not valid JSON: {}", e)],
        )
        .with_raw(Value::String(arguments.to_string()))),
    }
}

pub(crate) fn to_usage(usage: &OpenAIUsage) -> Usage {
    Usage::tokens(usage.prompt_tokens, usage.completion_tokens, usage.total_tokens)
}

pub(crate) fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::FunctionCall,
        "content_filter" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FunctionParameter, MediaSource};
    use serde_json::json;

    #[test]
    fn test_single_text_becomes_plain_string() {
        let request = ChatRequest::new("m1", vec![Message::user("hi")]).with_max_tokens(16);
        let native = serde_json::to_value(to_openai_request(&request).unwrap()).unwrap();

        assert_eq!(
            native,
            json!({
                "model": "m1",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 16
            })
        );
    }

    #[test]
    fn test_inline_image_becomes_data_url() {
        let message = Message::user("what is this?")
            .with_part(ContentPart::image(MediaSource::base64("image/png", "iVBORw0")));
        let native = to_openai_message(&message).unwrap();

        assert_eq!(
            serde_json::to_value(native.content).unwrap(),
            json!([
                {"type": "text", "text": "what is this?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0"}}
            ])
        );
    }

    #[test]
    fn test_functions_use_tools_only() {
        let request = ChatRequest::new("m", vec![Message::user("weather?")])
            .with_functions(vec![Function::new(
                "get_weather",
                FunctionParameter::object().with_property("city", FunctionParameter::string("City"), true),
            )])
            .with_force_function("get_weather");
        let native = serde_json::to_value(to_openai_request(&request).unwrap()).unwrap();

        assert!(native.get("functions").is_none());
        assert!(native.get("function_call").is_none());
        assert_eq!(native["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(
            native["tool_choice"],
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
    }

    #[test]
    fn test_function_history_round_trip() {
        let mut args = Map::new();
        args.insert("city".into(), json!("Paris"));
        let call = FunctionCall::new("get_weather", args).with_id("call_1");

        let assistant = to_openai_message(&Message::function_call(call.clone())).unwrap();
        assert_eq!(assistant.content, None);
        let tool_calls = assistant.tool_calls.unwrap();
        assert_eq!(tool_calls[0].id, "call_1");
        assert_eq!(tool_calls[0].function.arguments, r#"{"city":"Paris"}"#);

        let result = to_openai_message(&Message::function_result(
            call.with_response(json!({"temp": 21})),
        ))
        .unwrap();
        assert_eq!(result.role, "tool");
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(result.content, Some(OpenAIContent::Text(r#"{"temp":21}"#.into())));
    }

    #[test]
    fn test_json_mode() {
        let request = ChatRequest::new("m", vec![Message::user("json please")])
            .with_response_format(ResponseFormat::Json);
        let native = to_openai_request(&request).unwrap();
        assert_eq!(native.response_format.unwrap().format_type, "json_object");
    }

    #[test]
    fn test_parse_arguments_rejects_invalid_json() {
        let err = parse_arguments("{not json").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
        assert_eq!(parse_arguments("").unwrap(), Map::new());
    }
}
