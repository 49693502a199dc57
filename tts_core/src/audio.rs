//! In-memory audio resources addressable by URL.
//!
//! Synthesized audio is registered in an [`AudioStore`] and handed out as an
//! [`AudioHandle`]. The handle is the single owner of the entry: releasing or
//! dropping it revokes the URL and frees the buffer. Anyone else (the player,
//! a download) only holds the URL string and resolves it through the store,
//! which fails once the handle is gone.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use base64::Engine as _;
use bytes::Bytes;
use tracing::debug;

/// Content type assumed when the provider does not send one
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

const URL_PREFIX: &str = "blob:tts/";

/// Bytes plus their MIME type, as resolved from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResource {
    pub bytes: Bytes,
    pub content_type: String,
}

impl AudioResource {
    /// File extension matching the content type
    pub fn extension(&self) -> &'static str {
        extension_for(&self.content_type)
    }
}

/// Map a MIME type onto a file extension, mp3 when unknown
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "audio/ogg" | "audio/vorbis" => "ogg",
        "audio/pcm" | "audio/l16" => "pcm",
        _ => "mp3",
    }
}

/// Registry of live audio buffers, keyed by their URL
#[derive(Debug, Clone, Default)]
pub struct AudioStore {
    entries: Arc<RwLock<HashMap<String, AudioResource>>>,
}

impl AudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and get back the owning handle
    pub fn insert(&self, bytes: Bytes, content_type: &str) -> AudioHandle {
        let url = format!("{URL_PREFIX}{}", uuid::Uuid::new_v4());
        let len = bytes.len();
        self.write().insert(
            url.clone(),
            AudioResource {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        debug!(%url, len, content_type, "registered audio resource");

        AudioHandle {
            url,
            content_type: content_type.to_string(),
            len,
            store: self.clone(),
        }
    }

    /// Look up a live resource. `None` once its handle was released.
    pub fn resolve(&self, url: &str) -> Option<AudioResource> {
        self.read().get(url).cloned()
    }

    /// Number of resources that have not been released yet
    pub fn live_count(&self) -> usize {
        self.read().len()
    }

    fn revoke(&self, url: &str) -> bool {
        let removed = self.write().remove(url).is_some();
        if removed {
            debug!(%url, "revoked audio resource");
        }
        removed
    }

    // A panic while holding the lock leaves the map itself intact
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, AudioResource>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, AudioResource>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owning handle to a registered audio buffer
#[derive(Debug)]
pub struct AudioHandle {
    url: String,
    content_type: String,
    len: usize,
    store: AudioStore,
}

impl AudioHandle {
    /// Locally addressable URL usable as a playback source
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> Option<Bytes> {
        self.store.resolve(&self.url).map(|r| r.bytes)
    }

    /// Inline `data:` URL with the audio base64-encoded
    pub fn data_url(&self) -> Option<String> {
        let bytes = self.bytes()?;
        Some(format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        ))
    }

    /// Revoke the URL and free the buffer
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        self.store.revoke(&self.url);
    }
}
