//! Text-to-speech conversion for OpenAI

use super::converter::PROVIDER;
use super::types::OpenAISpeechRequest;
use crate::error::{LlmError, LlmResult};
use crate::protocol::{ResponseMetadata, SpeechRequest, SpeechResponse, Voice};
use uuid::Uuid;

/// OpenAI voice name for a neutral voice selector
pub fn voice_name(voice: Voice) -> &'static str {
    match voice {
        Voice::Male1 => "onyx",
        Voice::Male2 => "echo",
        Voice::Female1 => "nova",
        Voice::Female2 => "shimmer",
        Voice::Neutral => "alloy",
    }
}

pub fn to_openai_speech_request(request: &SpeechRequest) -> LlmResult<OpenAISpeechRequest> {
    Ok(OpenAISpeechRequest {
        model: request.model.clone(),
        input: request.input.clone(),
        voice: voice_name(request.voice).to_string(),
        response_format: request.format.as_str().to_string(),
        speed: request.speed,
    })
}

pub fn from_openai_speech_response(audio: Vec<u8>, request: &SpeechRequest) -> LlmResult<SpeechResponse> {
    if audio.is_empty() {
        return Err(LlmError::provider(PROVIDER, "speech response contained no audio"));
    }

    Ok(SpeechResponse {
        id: Uuid::new_v4().to_string(),
        audio,
        duration: None,
        format: request.format,
        metadata: ResponseMetadata {
            model: request.model.clone(),
            ..Default::default()
        },
    })
}
