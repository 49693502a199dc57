//! Shared text-to-speech types: the synthesis request and its validation,
//! the voice catalog, in-memory audio resources and the playback controller.

pub mod audio;
pub mod error;
pub mod player;
pub mod request;
pub mod ssml;
pub mod voice;

pub use audio::{AudioHandle, AudioResource, AudioStore, DEFAULT_CONTENT_TYPE};
pub use error::{Field, PlaybackError, ValidationError};
pub use player::{format_time, DeviceEvent, MediaDevice, PlaybackController, PlaybackState};
pub use request::{validate_text, Engine, OutputFormat, SynthesisRequest, MAX_TEXT_LENGTH};
pub use voice::{Gender, Voice, VoiceCatalog};
