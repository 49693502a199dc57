use thiserror::Error;
use tts_core::ValidationError;

/// Synthesis client errors
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Rejected locally, nothing was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend answered with a non-success status
    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// Connect, DNS, timeout or a broken body stream
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Another synthesis from this client is still pending
    #[error("A synthesis request is already in flight")]
    Busy,
}

impl SynthesisError {
    /// Text suitable for an alert or inline message
    pub fn user_message(&self) -> String {
        match self {
            SynthesisError::Validation(e) => e.to_string(),
            SynthesisError::Provider { message, .. } => message.clone(),
            SynthesisError::Transport(_) => {
                "Could not reach the speech service. Please check your connection and try again."
                    .to_string()
            }
            SynthesisError::Busy => "Audio is already being generated.".to_string(),
        }
    }
}
