use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use tracing::{debug, info, warn};
use tts_core::{AudioHandle, AudioStore, SynthesisRequest, Voice, VoiceCatalog, DEFAULT_CONTENT_TYPE};

use crate::config::ClientConfig;
use crate::error::SynthesisError;

pub const SYNTH_PATH: &str = "/synthesize";
pub const VOICES_PATH: &str = "/voices";

/// Request id headers, tried in order
pub const REQUEST_ID_HEADERS: [&str; 2] = ["x-amzn-requestid", "x-amz-request-id"];

/// Playable audio produced by one successful synthesis
#[derive(Debug)]
pub struct SynthesisResult {
    pub audio: AudioHandle,
    pub content_type: String,
    /// Provider-assigned id, empty when the backend sent none
    pub request_id: String,
}

impl SynthesisResult {
    pub fn url(&self) -> &str {
        self.audio.url()
    }

    /// Free the audio buffer
    pub fn release(self) {
        self.audio.release();
    }
}

/// Client for the synthesis backend
#[derive(Debug, Clone)]
pub struct SynthesisClient {
    http: reqwest::Client,
    config: ClientConfig,
    catalog: VoiceCatalog,
    store: AudioStore,
    in_flight: Arc<AtomicBool>,
}

impl SynthesisClient {
    /// Create a client validating against the built-in voice catalog
    pub fn new(config: ClientConfig, store: AudioStore) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            config,
            catalog: VoiceCatalog::builtin(),
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_catalog(mut self, catalog: VoiceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn set_catalog(&mut self, catalog: VoiceCatalog) {
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a synthesis is currently pending
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Send one synthesis request and turn the streamed answer into a
    /// playable resource. The caller owns the result and must release it.
    pub async fn synthesize(&self, req: &SynthesisRequest) -> Result<SynthesisResult, SynthesisError> {
        req.validate(&self.catalog)?;

        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("synthesis already pending, ignoring new request");
            return Err(SynthesisError::Busy);
        };

        let url = self.config.endpoint(SYNTH_PATH);
        info!(
            voice = %req.voice_id,
            engine = ?req.engine,
            chars = req.text.chars().count(),
            "sending synthesis request"
        );

        let response = self.http.post(&url).json(req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = if body.trim().is_empty() {
                "Text-to-speech failed".to_string()
            } else {
                body
            };
            warn!(status = status.as_u16(), %message, "synthesis rejected by backend");
            return Err(SynthesisError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = content_type(response.headers());
        let request_id = request_id(response.headers());

        let bytes = collect_body(response.bytes_stream()).await?;
        info!(bytes = bytes.len(), %content_type, %request_id, "synthesis complete");

        let audio = self.store.insert(bytes, &content_type);
        Ok(SynthesisResult {
            audio,
            content_type,
            request_id,
        })
    }

    /// Voices offered by the backend, or the configured catalog when the
    /// backend cannot provide them.
    pub async fn voices(&self) -> VoiceCatalog {
        match self.fetch_voices().await {
            Ok(voices) if !voices.is_empty() => VoiceCatalog::new(voices),
            Ok(_) => {
                warn!("backend returned no voices, using built-in catalog");
                self.catalog.clone()
            }
            Err(e) => {
                warn!(error = %e, "failed to load voices, using built-in catalog");
                self.catalog.clone()
            }
        }
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, SynthesisError> {
        let response = self.http.get(self.config.endpoint(VOICES_PATH)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Provider {
                status: status.as_u16(),
                message: format!("Failed to load voices ({})", status.as_u16()),
            });
        }
        Ok(response.json::<Vec<Voice>>().await?)
    }
}

/// Drain a stream of byte chunks into one contiguous buffer.
/// Chunks are appended as they arrive; the first error aborts.
pub async fn collect_body<S, E>(stream: S) -> Result<Bytes, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buf = BytesMut::new();
    let mut chunks = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buf.extend_from_slice(&chunk);
        chunks += 1;
    }
    debug!(chunks, bytes = buf.len(), "response body drained");
    Ok(buf.freeze())
}

/// Response content type, `audio/mpeg` when missing or unreadable
pub fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// First non-empty request id header, or an empty string
pub fn request_id(headers: &HeaderMap) -> String {
    REQUEST_ID_HEADERS
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.trim().is_empty())
        })
        .unwrap_or_default()
        .to_string()
}

// Clears the in-flight flag on every exit path, cancellation included
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
