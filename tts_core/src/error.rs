use thiserror::Error;

/// Form fields a validation failure can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    Voice,
    SpeechRate,
    Pitch,
}

/// Caller-correctable problems with a synthesis request.
/// Raised before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter some text to convert.")]
    EmptyText,

    #[error("Text exceeds maximum length of {max} characters ({len} given).")]
    TextTooLong { len: usize, max: usize },

    #[error("Invalid voice ID: {0}")]
    UnknownVoice(String),

    #[error("Speech rate must be a positive number, got {0:?}")]
    InvalidSpeechRate(String),

    #[error("Pitch must be a whole number of semitones, got {0:?}")]
    InvalidPitch(String),
}

impl ValidationError {
    /// Field the error should be shown next to
    pub fn field(&self) -> Field {
        match self {
            ValidationError::EmptyText | ValidationError::TextTooLong { .. } => Field::Text,
            ValidationError::UnknownVoice(_) => Field::Voice,
            ValidationError::InvalidSpeechRate(_) => Field::SpeechRate,
            ValidationError::InvalidPitch(_) => Field::Pitch,
        }
    }
}

/// Playback could not start. Recoverable by pressing play again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("audio resource is not ready")]
    NotReady,

    #[error("playback blocked: {0}")]
    Blocked(String),

    #[error("device error: {0}")]
    Device(String),
}
