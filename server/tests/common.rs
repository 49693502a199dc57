//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use bytes::Bytes;
use futures_util::StreamExt;
use server::config::ServerConfig;
use server::provider::{ProviderAudio, ProviderError, SpeechProvider};
use server::AppState;
use tts_core::{SynthesisRequest, VoiceCatalog};

pub const AUDIO: [&[u8]; 2] = [b"ID3\x04\x00", b"\xff\xfb\x90\x00"];

/// What the stub answers with
#[derive(Clone)]
pub enum Reply {
    Audio { request_id: Option<String> },
    Upstream { status: u16, body: String },
}

/// In-memory provider recording every request it receives
pub struct StubProvider {
    reply: Reply,
    calls: AtomicUsize,
    last: Mutex<Option<SynthesisRequest>>,
}

impl StubProvider {
    pub fn audio() -> Arc<Self> {
        Self::with(Reply::Audio {
            request_id: Some("upstream-req-1".to_string()),
        })
    }

    pub fn anonymous_audio() -> Arc<Self> {
        Self::with(Reply::Audio { request_id: None })
    }

    pub fn audio_with_request_id(id: &str) -> Arc<Self> {
        Self::with(Reply::Audio {
            request_id: Some(id.to_string()),
        })
    }

    pub fn failing(status: u16, body: &str) -> Arc<Self> {
        Self::with(Reply::Upstream {
            status,
            body: body.to_string(),
        })
    }

    fn with(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SynthesisRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechProvider for StubProvider {
    async fn synthesize(&self, req: &SynthesisRequest) -> Result<ProviderAudio, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(req.clone());
        match &self.reply {
            Reply::Audio { request_id } => {
                let chunks = AUDIO.iter().map(|c| Ok(Bytes::from_static(c)));
                let audio = ProviderAudio::new(
                    req.output_format.content_type(),
                    futures_util::stream::iter(chunks).boxed(),
                );
                Ok(match request_id {
                    Some(id) => audio.with_request_id(id.clone()),
                    None => audio,
                })
            }
            Reply::Upstream { status, body } => Err(ProviderError::Upstream {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Create a test app instance around `provider`
pub fn create_test_app(provider: Arc<dyn SpeechProvider>) -> Router {
    let state = AppState::new(provider, VoiceCatalog::builtin(), ServerConfig::default());
    server::router(state)
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
