//! Conversion between the universal model and the Gemini API

use super::types::*;
use crate::error::{LlmError, LlmResult};
use crate::protocol::{
    ChatRequest, ChatResponse, ContentPart, Embedding, EmbeddingInput, EmbeddingRequest,
    EmbeddingResponse, FinishReason, FunctionCall, MediaLocation, Message, MessageRole,
    ResponseMetadata, Usage,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

pub(crate) const PROVIDER: &str = "gemini";

/// Finish reasons that mean the candidate was withheld
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

pub fn to_gemini_request(request: &ChatRequest) -> LlmResult<GeminiRequest> {
    let config = &request.config;

    let system_parts: Vec<GeminiPart> = request
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| GeminiPart {
            text: Some(m.text()),
            ..Default::default()
        })
        .collect();

    let mut contents: Vec<GeminiContent> = Vec::new();
    for message in request.messages.iter().filter(|m| m.role != MessageRole::System) {
        let (role, parts) = convert_message(message)?;
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
            _ => contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts,
            }),
        }
    }

    let tools = config.functions.as_ref().filter(|f| !f.is_empty()).map(|functions| {
        vec![GeminiTool {
            function_declarations: functions
                .iter()
                .map(|f| GeminiFunctionDeclaration {
                    name: f.name.clone(),
                    description: f.description.clone(),
                    parameters: f.parameters.to_schema(),
                })
                .collect(),
        }]
    });

    let generation_config = GeminiGenerationConfig {
        temperature: config.temperature,
        top_p: config.top_p,
        top_k: config.top_k,
        max_output_tokens: config.max_tokens,
        stop_sequences: config.stop.clone(),
    };

    Ok(GeminiRequest {
        contents,
        system_instruction: (!system_parts.is_empty()).then_some(GeminiContent {
            role: None,
            parts: system_parts,
        }),
        tools,
        tool_config: config.force_function.as_ref().map(|name| GeminiToolConfig {
            function_calling_config: GeminiFunctionCallingConfig {
                mode: "ANY".to_string(),
                allowed_function_names: Some(vec![name.clone()]),
            },
        }),
        generation_config: (generation_config != GeminiGenerationConfig::default())
            .then_some(generation_config),
    })
}

fn convert_message(message: &Message) -> LlmResult<(&'static str, Vec<GeminiPart>)> {
    match message.role {
        MessageRole::Function => {
            let call = message.function_call.as_ref().ok_or_else(|| {
                LlmError::validation(PROVIDER, vec!["function message without function_call".into()])
            })?;
            let response = match &call.response {
                Some(Value::Object(map)) => Value::Object(map.clone()),
                Some(other) => json!({ "content": other }),
                None => json!({}),
            };
            Ok((
                "user",
                vec![GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        name: call.name.clone(),
                        response,
                    }),
                    ..Default::default()
                }],
            ))
        }
        MessageRole::Assistant => {
            let mut parts = convert_parts(&message.content)?;
            if let Some(call) = &message.function_call {
                parts.push(GeminiPart {
                    function_call: Some(GeminiFunctionCall {
                        name: call.name.clone(),
                        args: Value::Object(call.arguments.clone()),
                    }),
                    ..Default::default()
                });
            }
            Ok(("model", parts))
        }
        MessageRole::User | MessageRole::System => Ok(("user", convert_parts(&message.content)?)),
    }
}

fn convert_parts(parts: &[ContentPart]) -> LlmResult<Vec<GeminiPart>> {
    parts.iter().map(convert_part).collect()
}

fn convert_part(part: &ContentPart) -> LlmResult<GeminiPart> {
    if let Some(text) = part.as_text() {
        return Ok(GeminiPart {
            text: Some(text.to_string()),
            ..Default::default()
        });
    }

    let source = part.media().ok_or_else(|| {
        LlmError::validation(PROVIDER, vec!["content part has neither text nor media".into()])
    })?;
    match source.location() {
        Some(MediaLocation::Inline(data)) => Ok(GeminiPart {
            inline_data: Some(GeminiInlineData {
                mime_type: source.mime_type.clone(),
                data: data.to_string(),
            }),
            ..Default::default()
        }),
        Some(MediaLocation::Url(url)) => Ok(GeminiPart {
            file_data: Some(GeminiFileData {
                mime_type: Some(source.mime_type.clone()),
                file_uri: url.to_string(),
            }),
            ..Default::default()
        }),
        _ => Err(LlmError::validation(
            PROVIDER,
            vec!["media source must be inline data or a URL".into()],
        )),
    }
}

pub fn from_gemini_response(response: GeminiResponse, request: &ChatRequest) -> LlmResult<ChatResponse> {
    let raw = serde_json::to_value(&response).ok();
    let candidate = select_candidate(&response)?;

    let mut content = Vec::new();
    let mut calls = Vec::new();
    for part in candidate.content.iter().flat_map(|c| c.parts.iter()) {
        if let Some(text) = &part.text {
            content.push(ContentPart::text(text.clone()));
        }
        if let Some(call) = &part.function_call {
            calls.push(FunctionCall::new(call.name.clone(), function_args(&call.args)?));
        }
    }

    let finish_reason = if calls.is_empty() {
        candidate.finish_reason.as_deref().map(map_finish_reason)
    } else {
        Some(FinishReason::FunctionCall)
    };

    Ok(ChatResponse {
        id: response
            .response_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        content,
        function_calls: (!calls.is_empty()).then_some(calls),
        metadata: ResponseMetadata {
            model: response
                .model_version
                .clone()
                .unwrap_or_else(|| request.model.clone()),
            usage: response.usage_metadata.as_ref().map(to_usage),
            finish_reason,
            raw_response: raw,
        },
    })
}

/// First candidate that was not withheld, or an error naming the block reason
pub(crate) fn select_candidate(response: &GeminiResponse) -> LlmResult<&GeminiCandidate> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(blocked_error(reason, "prompt"));
    }

    if let Some(candidate) = response.candidates.iter().find(|c| !is_blocked(c)) {
        return Ok(candidate);
    }

    match response.candidates.first() {
        Some(candidate) => Err(blocked_error(
            candidate.finish_reason.as_deref().unwrap_or("SAFETY"),
            "response",
        )),
        None => Err(LlmError::provider(PROVIDER, "response contained no candidates")),
    }
}

pub(crate) fn is_blocked(candidate: &GeminiCandidate) -> bool {
    candidate
        .finish_reason
        .as_deref()
        .is_some_and(|r| BLOCKED_FINISH_REASONS.contains(&r))
        || candidate.safety_ratings.iter().any(|r| r.blocked)
}

fn blocked_error(reason: &str, what: &str) -> LlmError {
    LlmError::provider(PROVIDER, format!("{what} blocked by safety filters: {reason}")).with_code(reason)
}

pub(crate) fn function_args(args: &Value) -> LlmResult<Map<String, Value>> {
    match args {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(LlmError::validation(
            PROVIDER,
            vec![format!("functionCall args must be a JSON object, got {}", other)],
        )),
    }
}

pub(crate) fn to_usage(usage: &GeminiUsage) -> Usage {
    Usage::tokens(
        usage.prompt_token_count,
        usage.candidates_token_count,
        usage.total_token_count,
    )
}

pub(crate) fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        r if BLOCKED_FINISH_REASONS.contains(&r) => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

pub fn to_gemini_embedding_request(request: &EmbeddingRequest) -> LlmResult<GeminiEmbeddingRequest> {
    let requests = request
        .input
        .iter()
        .map(|input| {
            let part = match input {
                EmbeddingInput::Text(text) => GeminiPart {
                    text: Some(text.clone()),
                    ..Default::default()
                },
                EmbeddingInput::Content(part) => convert_part(part)?,
            };
            Ok(GeminiEmbedContentRequest {
                model: format!("models/{}", request.model),
                content: GeminiContent {
                    role: None,
                    parts: vec![part],
                },
            })
        })
        .collect::<LlmResult<Vec<_>>>()?;

    Ok(GeminiEmbeddingRequest { requests })
}

pub fn from_gemini_embedding_response(
    response: GeminiEmbeddingResponse,
    request: &EmbeddingRequest,
) -> LlmResult<EmbeddingResponse> {
    if response.embeddings.len() != request.input.len() {
        return Err(LlmError::provider(
            PROVIDER,
            format!(
                "expected {} embeddings, got {}",
                request.input.len(),
                response.embeddings.len()
            ),
        ));
    }

    let data: Vec<Embedding> = response
        .embeddings
        .into_iter()
        .enumerate()
        .map(|(index, e)| Embedding {
            index,
            embedding: e.values,
        })
        .collect();

    Ok(EmbeddingResponse {
        id: Uuid::new_v4().to_string(),
        usage: Usage {
            total_dimensions: data.first().map(|e| e.embedding.len() as u32),
            ..Default::default()
        },
        data,
        model: request.model.clone(),
    })
}
