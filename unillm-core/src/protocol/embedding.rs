//! Embedding request and response types

use super::types::{ContentPart, Usage};
use serde::{Deserialize, Serialize};

/// One item to embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Text(String),
    Content(ContentPart),
}

impl From<&str> for EmbeddingInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Wire encoding requested for embedding vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    #[default]
    Float,
    Base64,
}

impl EncodingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Base64 => "base64",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub model: String,

    pub input: Vec<EmbeddingInput>,

    #[serde(default)]
    pub encoding_format: EncodingFormat,
}

impl EmbeddingRequest {
    pub fn new<I, T>(model: impl Into<String>, input: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EmbeddingInput>,
    {
        Self {
            model: model.into(),
            input: input.into_iter().map(Into::into).collect(),
            encoding_format: EncodingFormat::default(),
        }
    }

    pub fn with_encoding_format(mut self, format: EncodingFormat) -> Self {
        self.encoding_format = format;
        self
    }

    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.model.trim().is_empty() {
            problems.push("model is required".to_string());
        }
        if self.input.is_empty() {
            problems.push("input must not be empty".to_string());
        }
        for (i, input) in self.input.iter().enumerate() {
            match input {
                EmbeddingInput::Text(text) if text.is_empty() => {
                    problems.push(format!("input[{i}]: text must not be empty"));
                }
                EmbeddingInput::Content(part) => {
                    if let Some(source) = part.media() {
                        problems.extend(source.validate(&format!("input[{i}]")));
                    }
                }
                _ => {}
            }
        }

        problems
    }
}

/// A single embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Position of the matching input
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub id: String,
    pub data: Vec<Embedding>,
    pub model: String,
    pub usage: Usage,
}
