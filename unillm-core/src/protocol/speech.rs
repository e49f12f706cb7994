//! Speech synthesis request and response types

use super::types::ResponseMetadata;
use serde::{Deserialize, Serialize};

/// Vendor-neutral voice selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    #[serde(rename = "male-1")]
    Male1,
    #[serde(rename = "male-2")]
    Male2,
    #[serde(rename = "female-1")]
    Female1,
    #[serde(rename = "female-2")]
    Female2,
    #[serde(rename = "neutral")]
    Neutral,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male1 => "male-1",
            Self::Male2 => "male-2",
            Self::Female1 => "female-1",
            Self::Female2 => "female-2",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Ogg,
    Flac,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
        }
    }
}

fn default_speed() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub model: String,

    /// Text to synthesize
    pub input: String,

    pub voice: Voice,

    #[serde(default)]
    pub format: AudioFormat,

    /// Playback speed multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Pitch shift in semitones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,

    /// Volume multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
}

impl SpeechRequest {
    pub fn new(model: impl Into<String>, input: impl Into<String>, voice: Voice) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            voice,
            format: AudioFormat::default(),
            speed: default_speed(),
            pitch: None,
            volume: None,
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.model.trim().is_empty() {
            problems.push("model is required".to_string());
        }
        if self.input.trim().is_empty() {
            problems.push("input must not be empty".to_string());
        }
        if !(self.speed > 0.0 && self.speed <= 4.0) {
            problems.push(format!("speed must be in (0.0, 4.0], got {}", self.speed));
        }
        if let Some(pitch) = self.pitch {
            if !(-20.0..=20.0).contains(&pitch) {
                problems.push(format!("pitch must be between -20.0 and 20.0, got {pitch}"));
            }
        }
        if let Some(volume) = self.volume {
            if !(0.0..=2.0).contains(&volume) {
                problems.push(format!("volume must be between 0.0 and 2.0, got {volume}"));
            }
        }

        problems
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechResponse {
    pub id: String,

    /// Encoded audio bytes in `format`
    pub audio: Vec<u8>,

    /// Seconds of audio, when the vendor reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    pub format: AudioFormat,

    pub metadata: ResponseMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_wire_names() {
        assert_eq!(serde_json::to_string(&Voice::Female2).unwrap(), "\"female-2\"");
        let voice: Voice = serde_json::from_str("\"male-1\"").unwrap();
        assert_eq!(voice, Voice::Male1);
    }

    #[test]
    fn test_speed_defaults_to_one() {
        let request: SpeechRequest =
            serde_json::from_str(r#"{"model": "tts-1", "input": "hi", "voice": "neutral"}"#).unwrap();
        assert_eq!(request.speed, 1.0);
        assert_eq!(request.format, AudioFormat::Mp3);
        assert!(request.validate().is_empty());
    }

    #[test]
    fn test_validate_ranges() {
        let request = SpeechRequest::new("tts-1", "hi", Voice::Neutral)
            .with_speed(0.0)
            .with_pitch(30.0)
            .with_volume(-1.0);
        assert_eq!(request.validate().len(), 3);
    }
}
