use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::voice::VoiceCatalog;

/// Maximum text length for synthesis requests, in characters
pub const MAX_TEXT_LENGTH: usize = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Standard,
    Neural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mp3,
    OggVorbis,
    Pcm,
}

impl OutputFormat {
    /// MIME type the provider answers with for this format
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "audio/mpeg",
            OutputFormat::OggVorbis => "audio/ogg",
            OutputFormat::Pcm => "audio/pcm",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::OggVorbis => "ogg_vorbis",
            OutputFormat::Pcm => "pcm",
        }
    }
}

/// Wire shape of a synthesis request, shared by the client and the proxy.
/// Rate and pitch travel as strings, the way the form produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: String,
    #[serde(default = "default_pitch")]
    pub pitch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<String>,
}

fn default_speech_rate() -> String {
    "1".to_string()
}

fn default_pitch() -> String {
    "0".to_string()
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            engine: Engine::default(),
            output_format: OutputFormat::default(),
            speech_rate: default_speech_rate(),
            pitch: default_pitch(),
            language_code: None,
            sample_rate: None,
        }
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Rate multiplier, 1.0 is normal speed
    pub fn speech_rate(mut self, rate: f32) -> Self {
        self.speech_rate = rate.to_string();
        self
    }

    /// Pitch offset in semitones
    pub fn pitch(mut self, semitones: i32) -> Self {
        self.pitch = semitones.to_string();
        self
    }

    pub fn language_code(mut self, code: impl Into<String>) -> Self {
        self.language_code = Some(code.into());
        self
    }

    /// Parsed speech rate, if the string holds a positive finite number
    pub fn rate_value(&self) -> Option<f32> {
        self.speech_rate
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Parsed pitch offset in semitones
    pub fn pitch_value(&self) -> Option<i32> {
        self.pitch.trim().parse::<i32>().ok()
    }

    /// Check everything that can be checked without the provider.
    pub fn validate(&self, catalog: &VoiceCatalog) -> Result<(), ValidationError> {
        validate_text(&self.text)?;

        if !catalog.contains(&self.voice_id) {
            return Err(ValidationError::UnknownVoice(self.voice_id.clone()));
        }
        if self.rate_value().is_none() {
            return Err(ValidationError::InvalidSpeechRate(self.speech_rate.clone()));
        }
        if self.pitch_value().is_none() {
            return Err(ValidationError::InvalidPitch(self.pitch.clone()));
        }
        Ok(())
    }
}

/// Validate the text field alone
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    // Limit is in characters, not bytes
    let len = text.chars().count();
    if len > MAX_TEXT_LENGTH {
        return Err(ValidationError::TextTooLong {
            len,
            max: MAX_TEXT_LENGTH,
        });
    }
    Ok(())
}
