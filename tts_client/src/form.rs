//! The text-to-speech form: user-editable parameters, the current result and
//! the message shown to the user after each attempt.

use tracing::{error, info, warn};
use tts_core::{Engine, Field, OutputFormat, SynthesisRequest, VoiceCatalog, MAX_TEXT_LENGTH};

use crate::client::{SynthesisClient, SynthesisResult};
use crate::error::SynthesisError;

pub const SUCCESS_MESSAGE: &str = "Audio generated successfully!";

/// Dismissible banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Error(String),
    Success(String),
}

/// Message shown next to a form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// What a call to [`SpeechForm::generate`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// New audio replaced the previous result
    Generated,
    /// Input was invalid, see [`SpeechForm::field_error`]
    Invalid,
    /// Backend or network failed, see [`SpeechForm::alert`]
    Failed,
    /// Another generation was still pending
    Ignored,
}

pub struct SpeechForm {
    client: SynthesisClient,
    voices: VoiceCatalog,
    pub text: String,
    pub voice_id: String,
    pub speech_rate: f32,
    pub pitch: i32,
    pub engine: Engine,
    result: Option<SynthesisResult>,
    alert: Option<Alert>,
    field_error: Option<FieldError>,
}

impl SpeechForm {
    pub fn new(client: SynthesisClient) -> Self {
        let voices = client.catalog().clone();
        let voice_id = voices
            .voices()
            .first()
            .map(|v| v.id.clone())
            .unwrap_or_default();
        Self {
            client,
            voices,
            text: String::new(),
            voice_id,
            speech_rate: 1.0,
            pitch: 0,
            engine: Engine::Standard,
            result: None,
            alert: None,
            field_error: None,
        }
    }

    /// Reload the voice list from the backend, keeping the selection when
    /// the selected voice still exists.
    pub async fn refresh_voices(&mut self) {
        let voices = self.client.voices().await;
        if !voices.contains(&self.voice_id) {
            if let Some(first) = voices.voices().first() {
                self.voice_id = first.id.clone();
            }
        }
        self.client.set_catalog(voices.clone());
        self.voices = voices;
    }

    pub fn voices(&self) -> &VoiceCatalog {
        &self.voices
    }

    pub fn result(&self) -> Option<&SynthesisResult> {
        self.result.as_ref()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn field_error(&self) -> Option<&FieldError> {
        self.field_error.as_ref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn character_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the generate action should be enabled
    pub fn can_generate(&self) -> bool {
        !self.client.is_pending()
            && !self.text.trim().is_empty()
            && self.character_count() <= MAX_TEXT_LENGTH
    }

    pub fn is_generating(&self) -> bool {
        self.client.is_pending()
    }

    /// The request the current field values describe
    pub fn request(&self) -> SynthesisRequest {
        SynthesisRequest::new(self.text.trim(), self.voice_id.clone())
            .engine(self.engine)
            .output_format(OutputFormat::Mp3)
            .speech_rate(self.speech_rate)
            .pitch(self.pitch)
    }

    /// Synthesize the current text. On success the previous result is
    /// released and replaced; on failure it stays playable.
    pub async fn generate(&mut self) -> GenerateOutcome {
        let previous_alert = self.alert.take();
        let previous_field_error = self.field_error.take();

        // Untrimmed length is what the user sees in the counter
        if let Err(e) = tts_core::validate_text(&self.text) {
            self.reject(e);
            return GenerateOutcome::Invalid;
        }

        let req = self.request();
        match self.client.synthesize(&req).await {
            Ok(result) => {
                info!(url = %result.url(), request_id = %result.request_id, "new audio ready");
                if let Some(previous) = self.result.replace(result) {
                    previous.release();
                }
                self.alert = Some(Alert::Success(SUCCESS_MESSAGE.to_string()));
                GenerateOutcome::Generated
            }
            Err(SynthesisError::Validation(e)) => {
                self.reject(e);
                GenerateOutcome::Invalid
            }
            Err(SynthesisError::Busy) => {
                // Another request owns the form's messages
                self.alert = previous_alert;
                self.field_error = previous_field_error;
                GenerateOutcome::Ignored
            }
            Err(e @ SynthesisError::Provider { .. }) => {
                warn!(error = %e, "synthesis failed");
                self.alert = Some(Alert::Error(e.user_message()));
                GenerateOutcome::Failed
            }
            Err(e @ SynthesisError::Transport(_)) => {
                error!(error = %e, "synthesis request failed");
                self.alert = Some(Alert::Error(e.user_message()));
                GenerateOutcome::Failed
            }
        }
    }

    /// Release the current audio, e.g. when the form goes away
    pub fn close(&mut self) {
        if let Some(result) = self.result.take() {
            result.release();
        }
        self.alert = None;
        self.field_error = None;
    }

    fn reject(&mut self, e: tts_core::ValidationError) {
        self.field_error = Some(FieldError {
            field: e.field(),
            message: e.to_string(),
        });
    }
}
