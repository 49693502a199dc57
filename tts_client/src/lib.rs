//! Client side of the text-to-speech form: sends synthesis requests to the
//! backend, drains the streamed audio into a playable resource, and keeps
//! the form's result and messages.

pub mod client;
pub mod config;
pub mod error;
pub mod form;

pub use client::{collect_body, SynthesisClient, SynthesisResult};
pub use config::ClientConfig;
pub use error::SynthesisError;
pub use form::{Alert, FieldError, GenerateOutcome, SpeechForm};
