//! Embedding conversion for OpenAI

use super::converter::PROVIDER;
use super::types::{
    OpenAIEmbeddingRequest, OpenAIEmbeddingResponse, OpenAIEmbeddingVector, OpenAIUsage,
};
use crate::error::{LlmError, LlmResult};
use crate::protocol::{Embedding, EmbeddingInput, EmbeddingRequest, EmbeddingResponse, Usage};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

pub fn to_openai_embedding_request(request: &EmbeddingRequest) -> LlmResult<OpenAIEmbeddingRequest> {
    let input = request
        .input
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            EmbeddingInput::Text(text) => Ok(text.clone()),
            EmbeddingInput::Content(part) => part.as_text().map(str::to_string).ok_or_else(|| {
                LlmError::validation(
                    PROVIDER,
                    vec![format!(
                        "input[{i}]: unsupported content type {} for {PROVIDER} embeddings",
                        part.content_type().as_str()
                    )],
                )
            }),
        })
        .collect::<LlmResult<Vec<_>>>()?;

    Ok(OpenAIEmbeddingRequest {
        model: request.model.clone(),
        input,
        encoding_format: request.encoding_format.as_str().to_string(),
    })
}

pub fn from_openai_embedding_response(
    response: OpenAIEmbeddingResponse,
    _request: &EmbeddingRequest,
) -> LlmResult<EmbeddingResponse> {
    let mut data = response
        .data
        .into_iter()
        .map(|item| {
            Ok(Embedding {
                index: item.index,
                embedding: decode_vector(item.embedding)?,
            })
        })
        .collect::<LlmResult<Vec<_>>>()?;
    data.sort_by_key(|e| e.index);

    let mut usage = response
        .usage
        .as_ref()
        .map(|u: &OpenAIUsage| Usage::tokens(u.prompt_tokens, None, u.total_tokens))
        .unwrap_or_default();
    usage.total_dimensions = data.first().map(|e| e.embedding.len() as u32);

    Ok(EmbeddingResponse {
        // The embeddings endpoint returns no id
        id: Uuid::new_v4().to_string(),
        data,
        model: response.model,
        usage,
    })
}

/// Base64 vectors are packed little-endian f32 values
fn decode_vector(vector: OpenAIEmbeddingVector) -> LlmResult<Vec<f32>> {
    match vector {
        OpenAIEmbeddingVector::Float(values) => Ok(values),
        OpenAIEmbeddingVector::Base64(encoded) => {
            let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                LlmError::provider(PROVIDER, format!("invalid base64 embedding: {}", e))
                    .with_code("decode")
            })?;
            if bytes.len() % 4 != 0 {
                return Err(LlmError::provider(
                    PROVIDER,
                    format!("base64 embedding has {} bytes, not a multiple of 4", bytes.len()),
                )
                .with_code("decode"));
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ContentPart, EncodingFormat, MediaSource};
    use serde_json::json;

    #[test]
    fn test_request_uses_encoding_format() {
        let request = EmbeddingRequest::new("text-embedding-3-small", ["a", "b"])
            .with_encoding_format(EncodingFormat::Base64);
        let native = to_openai_embedding_request(&request).unwrap();
        assert_eq!(native.input, vec!["a", "b"]);
        assert_eq!(native.encoding_format, "base64");
    }

    #[test]
    fn test_request_rejects_media_input() {
        let request = EmbeddingRequest::new(
            "m",
            [EmbeddingInput::Content(ContentPart::image(MediaSource::url(
                "image/png",
                "https://x/y.png",
            )))],
        );
        let err = to_openai_embedding_request(&request).unwrap_err();
        assert_eq!(
            err.problems,
            vec!["input[0]: unsupported content type image for openai embeddings".to_string()]
        );
    }

    #[test]
    fn test_decode_base64_vector() {
        let mut bytes = Vec::new();
        for v in [1.0f32, -0.5, 0.25] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let response: OpenAIEmbeddingResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": STANDARD.encode(&bytes)}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        }))
        .unwrap();

        let request = EmbeddingRequest::new("text-embedding-3-small", ["hi"]);
        let out = from_openai_embedding_response(response, &request).unwrap();
        assert_eq!(out.data[0].embedding, vec![1.0, -0.5, 0.25]);
        assert_eq!(out.usage.prompt_tokens, Some(2));
        assert_eq!(out.usage.total_dimensions, Some(3));
    }

    #[test]
    fn test_results_are_ordered_by_index() {
        let response: OpenAIEmbeddingResponse = serde_json::from_value(json!({
            "data": [
                {"index": 1, "embedding": [0.2]},
                {"index": 0, "embedding": [0.1]}
            ],
            "model": "m"
        }))
        .unwrap();

        let out =
            from_openai_embedding_response(response, &EmbeddingRequest::new("m", ["a", "b"])).unwrap();
        assert_eq!(out.data[0].embedding, vec![0.1]);
        assert_eq!(out.data[1].index, 1);
    }
}
