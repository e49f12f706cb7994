//! Core chat types shared by every provider
//!
//! The types here are vendor-neutral. Adapters translate them to and from
//! native payloads; nothing in this module performs I/O except
//! [`MediaSource::load_path`], which callers use to inline files before
//! dispatch.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
    /// Result of a function call
    Function,
}

/// Kind of content carried by a [`ContentPart`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Pdf,
    Video,
    Audio,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Where the bytes of a media part live.
///
/// Exactly one of `data`, `url` or `path` must be set. The fields are kept
/// independent so that a malformed source deserialized from caller input can
/// be reported by validation instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    /// MIME type of the media, e.g. `image/png`
    pub mime_type: String,

    /// Base64-encoded payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Remote location of the media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Local filesystem path of the media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Borrowed view of a well-formed [`MediaSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLocation<'a> {
    Inline(&'a str),
    Url(&'a str),
    Path(&'a Path),
}

impl MediaSource {
    pub fn base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data.into()),
            url: None,
            path: None,
        }
    }

    pub fn url(mime_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            url: Some(url.into()),
            path: None,
        }
    }

    pub fn path(mime_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            url: None,
            path: Some(path.into()),
        }
    }

    /// The single location of this source, or `None` when zero or several are set
    pub fn location(&self) -> Option<MediaLocation<'_>> {
        match (&self.data, &self.url, &self.path) {
            (Some(data), None, None) => Some(MediaLocation::Inline(data)),
            (None, Some(url), None) => Some(MediaLocation::Url(url)),
            (None, None, Some(path)) => Some(MediaLocation::Path(path)),
            _ => None,
        }
    }

    /// Decoded size in bytes of an inline payload, computed without decoding
    pub fn inline_size(&self) -> Option<usize> {
        let data = self.data.as_deref()?;
        Some(data.trim_end_matches('=').len() * 3 / 4)
    }

    /// Problems with this source, prefixed by `at`
    pub fn validate(&self, at: &str) -> Vec<String> {
        let mut problems = Vec::new();
        let set = [self.data.is_some(), self.url.is_some(), self.path.is_some()]
            .iter()
            .filter(|s| **s)
            .count();
        match set {
            0 => problems.push(format!("{at}: media source must set one of data, url or path")),
            1 => {}
            _ => problems.push(format!(
                "{at}: media source must set exactly one of data, url or path"
            )),
        }
        if self.mime_type.is_empty() {
            problems.push(format!("{at}: media source mime_type is required"));
        }
        problems
    }

    /// Read a path source into an inline base64 source
    pub async fn load_path(&self) -> std::io::Result<MediaSource> {
        match &self.path {
            Some(path) if self.data.is_none() && self.url.is_none() => {
                let bytes = tokio::fs::read(path).await?;
                Ok(MediaSource::base64(self.mime_type.clone(), BASE64.encode(bytes)))
            }
            _ => Ok(self.clone()),
        }
    }
}

/// One ordered piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text { text: String },
    Image { source: MediaSource },
    Pdf { source: MediaSource },
    Video { source: MediaSource },
    Audio { source: MediaSource },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(source: MediaSource) -> Self {
        Self::Image { source }
    }

    pub fn pdf(source: MediaSource) -> Self {
        Self::Pdf { source }
    }

    pub fn video(source: MediaSource) -> Self {
        Self::Video { source }
    }

    pub fn audio(source: MediaSource) -> Self {
        Self::Audio { source }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Text { .. } => ContentType::Text,
            Self::Image { .. } => ContentType::Image,
            Self::Pdf { .. } => ContentType::Pdf,
            Self::Video { .. } => ContentType::Video,
            Self::Audio { .. } => ContentType::Audio,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn media(&self) -> Option<&MediaSource> {
        match self {
            Self::Text { .. } => None,
            Self::Image { source }
            | Self::Pdf { source }
            | Self::Video { source }
            | Self::Audio { source } => Some(source),
        }
    }

    /// Inline a path-based media source; text parts are returned unchanged
    pub async fn load_path(&self) -> std::io::Result<ContentPart> {
        Ok(match self {
            Self::Text { .. } => self.clone(),
            Self::Image { source } => Self::Image { source: source.load_path().await? },
            Self::Pdf { source } => Self::Pdf { source: source.load_path().await? },
            Self::Video { source } => Self::Video { source: source.load_path().await? },
            Self::Audio { source } => Self::Audio { source: source.load_path().await? },
        })
    }
}

/// A function invocation, either pending (on an assistant message) or
/// resolved (on a function message, carrying `response`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Vendor call id used to correlate a call with its result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Result of executing the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
            response: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Call id, falling back to one derived from the function name
    pub fn call_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| format!("call_{}", self.name))
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,

    /// Ordered content; order is significant for interleaved text and media
    #[serde(default)]
    pub content: Vec<ContentPart>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    pub fn new(role: MessageRole, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            name: None,
            function_call: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentPart::text(text)])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentPart::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, vec![ContentPart::text(text)])
    }

    /// Assistant turn requesting a function call
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::new(MessageRole::Assistant, Vec::new())
        }
    }

    /// Function turn carrying the result of a call
    pub fn function_result(call: FunctionCall) -> Self {
        Self {
            name: Some(call.name.clone()),
            function_call: Some(call),
            ..Self::new(MessageRole::Function, Vec::new())
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_part(mut self, part: ContentPart) -> Self {
        self.content.push(part);
        self
    }

    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentPart::as_text).collect()
    }

    /// Problems with this message, prefixed by `at`
    pub fn validate(&self, at: &str) -> Vec<String> {
        let mut problems = Vec::new();

        if self.content.is_empty() && self.function_call.is_none() {
            problems.push(format!("{at}: content must not be empty"));
        }

        for (i, part) in self.content.iter().enumerate() {
            if let Some(source) = part.media() {
                problems.extend(source.validate(&format!("{at}.content[{i}]")));
            }
        }

        match (self.role, &self.function_call) {
            (MessageRole::Function, None) => {
                problems.push(format!("{at}: function message must carry a function_call"));
            }
            (MessageRole::Function, Some(call)) if call.response.is_none() => {
                problems.push(format!(
                    "{at}: function message must carry the call response"
                ));
            }
            (MessageRole::Assistant, Some(call)) if call.response.is_some() => {
                problems.push(format!(
                    "{at}: assistant function_call must not carry a response"
                ));
            }
            (MessageRole::System | MessageRole::User, Some(_)) => {
                problems.push(format!(
                    "{at}: function_call is only allowed on assistant or function messages"
                ));
            }
            _ => {}
        }

        if let Some(call) = &self.function_call {
            if call.name.is_empty() {
                problems.push(format!("{at}: function_call name is required"));
            }
        }

        problems
    }
}

/// JSON-schema fragment describing a function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameter {
    #[serde(rename = "type")]
    pub param_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FunctionParameter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, FunctionParameter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl FunctionParameter {
    pub fn of_type(param_type: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            description: None,
            enum_values: None,
            items: None,
            properties: None,
            required: None,
        }
    }

    pub fn object() -> Self {
        Self::of_type("object")
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::of_type("string").with_description(description)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_items(mut self, items: FunctionParameter) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Add a property; `required` also lists it in the schema's `required` array
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        param: FunctionParameter,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.get_or_insert_with(Vec::new).push(name.clone());
        }
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name, param);
        self
    }

    /// The schema as a JSON value
    pub fn to_schema(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub parameters: FunctionParameter,
}

impl Function {
    pub fn new(name: impl Into<String>, parameters: FunctionParameter) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Requested response format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Sampling and limit settings for a chat request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter (0.0 to 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    #[serde(default)]
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Function>>,

    /// Name of a declared function the model must call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_function: Option<String>,

    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl GenerationConfig {
    pub fn has_functions(&self) -> bool {
        self.functions.as_ref().is_some_and(|f| !f.is_empty())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                problems.push(format!("config.temperature must be between 0.0 and 2.0, got {t}"));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                problems.push(format!("config.top_p must be between 0.0 and 1.0, got {p}"));
            }
        }
        if self.top_k == Some(0) {
            problems.push("config.top_k must be greater than 0".to_string());
        }
        if self.max_tokens == Some(0) {
            problems.push("config.max_tokens must be greater than 0".to_string());
        }

        let mut names = HashSet::new();
        for (i, function) in self.functions.iter().flatten().enumerate() {
            if function.name.is_empty() {
                problems.push(format!("config.functions[{i}]: name is required"));
            } else if !names.insert(function.name.as_str()) {
                problems.push(format!(
                    "config.functions[{i}]: duplicate function name '{}'",
                    function.name
                ));
            }
        }

        if let Some(forced) = &self.force_function {
            if !names.contains(forced.as_str()) {
                problems.push(format!(
                    "config.force_function '{forced}' is not a declared function"
                ));
            }
        }

        problems
    }
}

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,

    pub messages: Vec<Message>,

    #[serde(default)]
    pub config: GenerationConfig,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.config.top_k = Some(top_k);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.config.stop = Some(stop);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.config.stream = stream;
        self
    }

    pub fn with_functions(mut self, functions: Vec<Function>) -> Self {
        self.config.functions = Some(functions);
        self
    }

    pub fn with_force_function(mut self, name: impl Into<String>) -> Self {
        self.config.force_function = Some(name.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    /// Every schema-level problem with this request; empty when acceptable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.model.trim().is_empty() {
            problems.push("model is required".to_string());
        }
        if self.messages.is_empty() {
            problems.push("messages must not be empty".to_string());
        }
        for (i, message) in self.messages.iter().enumerate() {
            problems.extend(message.validate(&format!("messages[{i}]")));
        }
        problems.extend(self.config.validate());

        problems
    }

    /// Every content part across all messages
    pub fn parts(&self) -> impl Iterator<Item = &ContentPart> {
        self.messages.iter().flat_map(|m| m.content.iter())
    }
}

/// Why generation stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    FunctionCall,
    ContentFilter,
    Other(String),
}

/// Token, duration and dimension counters.
///
/// Every counter is optional; a provider that does not report a value leaves
/// it `None`, which is distinct from an observed zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,

    /// Seconds of generated audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_dimensions: Option<u32>,
}

impl Usage {
    /// Token usage; `total` falls back to `prompt + completion` when both are known
    pub fn tokens(prompt: Option<u32>, completion: Option<u32>, total: Option<u32>) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: total.or_else(|| sum_tokens(prompt, completion)),
            ..Self::default()
        }
    }

    /// Fold a later partial report into this one.
    ///
    /// Each counter keeps the most recent reported value. When the update
    /// changes a token counter without reporting a total, the total is derived
    /// again from the merged counters.
    pub fn merge(&mut self, update: Usage) {
        let derive_total = update.total_tokens.is_none()
            && (update.prompt_tokens.is_some() || update.completion_tokens.is_some());

        self.prompt_tokens = update.prompt_tokens.or(self.prompt_tokens);
        self.completion_tokens = update.completion_tokens.or(self.completion_tokens);
        self.total_tokens = update.total_tokens.or(self.total_tokens);
        self.audio_duration = update.audio_duration.or(self.audio_duration);
        self.total_dimensions = update.total_dimensions.or(self.total_dimensions);

        if derive_total {
            self.total_tokens =
                sum_tokens(self.prompt_tokens, self.completion_tokens).or(self.total_tokens);
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn sum_tokens(prompt: Option<u32>, completion: Option<u32>) -> Option<u32> {
    prompt?.checked_add(completion?)
}

/// Metadata attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Vendor payload retained for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

/// Chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,

    pub content: Vec<ContentPart>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_calls: Option<Vec<FunctionCall>>,

    pub metadata: ResponseMetadata,
}

impl ChatResponse {
    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentPart::as_text).collect()
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.metadata.usage.as_ref()
    }
}

/// Fragment of a function call delivered by a stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Raw JSON text fragment of the arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// The incremental unit of a stream chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamDelta {
    Content { index: usize, part: ContentPart },
    FunctionCall { index: usize, call: FunctionCallDelta },
}

impl StreamDelta {
    pub fn text(index: usize, text: impl Into<String>) -> Self {
        Self::Content {
            index,
            part: ContentPart::text(text),
        }
    }
}

/// One chunk of a streamed chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStreamResponse {
    /// Response id; empty when the vendor only sends it on the first event
    pub id: String,

    /// `None` for lifecycle events that carry no content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<StreamDelta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,

    #[serde(default)]
    pub done: bool,
}

impl ChatStreamResponse {
    pub fn new(id: impl Into<String>, delta: Option<StreamDelta>) -> Self {
        Self {
            id: id.into(),
            delta,
            metadata: None,
            done: false,
        }
    }

    pub fn with_metadata(mut self, metadata: ResponseMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn finished(mut self) -> Self {
        self.done = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_part_serializes_with_type_tag() {
        let part = ContentPart::text("hi");
        assert_eq!(serde_json::to_value(&part).unwrap(), json!({"type": "text", "text": "hi"}));

        let image = ContentPart::image(MediaSource::url("image/png", "https://x/y.png"));
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            json!({"type": "image", "source": {"mime_type": "image/png", "url": "https://x/y.png"}})
        );
    }

    #[test]
    fn test_media_source_location() {
        assert_eq!(
            MediaSource::base64("image/png", "AAAA").location(),
            Some(MediaLocation::Inline("AAAA"))
        );

        let mut dual = MediaSource::url("image/png", "https://x");
        dual.data = Some("AAAA".into());
        assert_eq!(dual.location(), None);
        assert_eq!(dual.validate("p").len(), 1);
    }

    #[test]
    fn test_inline_size() {
        // "hello" -> "aGVsbG8="
        assert_eq!(MediaSource::base64("text/plain", "aGVsbG8=").inline_size(), Some(5));
        assert_eq!(MediaSource::base64("text/plain", "aGVsbG8h").inline_size(), Some(6));
        assert_eq!(MediaSource::url("text/plain", "https://x").inline_size(), None);
    }

    #[test]
    fn test_function_message_requires_response() {
        let call = FunctionCall::new("lookup", Map::new());
        let pending = Message::function_result(call.clone());
        assert_eq!(pending.validate("m").len(), 1);

        let resolved = Message::function_result(call.with_response(json!({"ok": true})));
        assert!(resolved.validate("m").is_empty());
    }

    #[test]
    fn test_assistant_call_must_be_pending() {
        let call = FunctionCall::new("lookup", Map::new()).with_response(json!(1));
        let message = Message::function_call(call);
        let problems = message.validate("messages[0]");
        assert_eq!(
            problems,
            vec!["messages[0]: assistant function_call must not carry a response".to_string()]
        );
    }

    #[test]
    fn test_request_collects_every_problem() {
        let request = ChatRequest::new("", vec![])
            .with_temperature(3.0)
            .with_force_function("missing");

        let problems = request.validate();
        assert_eq!(problems.len(), 4);
        assert!(problems.contains(&"model is required".to_string()));
        assert!(problems.contains(&"messages must not be empty".to_string()));
        assert!(problems.iter().any(|p| p.contains("force_function 'missing'")));
    }

    #[test]
    fn test_usage_tokens_derives_total() {
        let usage = Usage::tokens(Some(3), Some(4), None);
        assert_eq!(usage.total_tokens, Some(7));

        let partial = Usage::tokens(None, Some(4), None);
        assert_eq!(partial.total_tokens, None);
        assert_eq!(partial.prompt_tokens, None);
    }

    #[test]
    fn test_usage_total_does_not_overflow() {
        let usage = Usage::tokens(Some(u32::MAX), Some(1), None);
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.prompt_tokens, Some(u32::MAX));
    }

    #[test]
    fn test_usage_merge_keeps_earlier_counters() {
        let mut usage = Usage::tokens(Some(10), Some(1), None);
        usage.merge(Usage::tokens(None, Some(4), None));
        assert_eq!(usage, Usage::tokens(Some(10), Some(4), Some(14)));

        // A reported total is taken as is
        usage.merge(Usage::tokens(None, None, Some(20)));
        assert_eq!(usage.total_tokens, Some(20));
        assert_eq!(usage.completion_tokens, Some(4));
    }

    #[test]
    fn test_function_parameter_schema() {
        let params = FunctionParameter::object()
            .with_property("city", FunctionParameter::string("City name"), true)
            .with_property("unit", FunctionParameter::of_type("string").with_enum(vec![json!("c"), json!("f")]), false);

        assert_eq!(
            params.to_schema(),
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"},
                    "unit": {"type": "string", "enum": ["c", "f"]}
                },
                "required": ["city"]
            })
        );
    }
}
