//! Upstream speech provider.
//!
//! The server never buffers synthesized audio: a provider hands back the
//! response metadata plus a byte stream that is forwarded as-is.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream::BoxStream, StreamExt, TryStreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use tts_core::{ssml, Engine, SynthesisRequest, DEFAULT_CONTENT_TYPE};

/// Provider response headers carrying the request id, in lookup order
pub const REQUEST_ID_HEADERS: [&str; 2] = ["x-amzn-requestid", "x-amz-request-id"];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("speech provider is not configured (set PROVIDER_URL)")]
    NotConfigured,

    #[error("provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Audio coming back from a provider
pub struct ProviderAudio {
    pub content_type: String,
    pub request_id: Option<String>,
    pub body: BoxStream<'static, std::io::Result<Bytes>>,
}

impl ProviderAudio {
    pub fn new(
        content_type: impl Into<String>,
        body: BoxStream<'static, std::io::Result<Bytes>>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            request_id: None,
            body,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Start synthesis for an already validated request
    async fn synthesize(&self, req: &SynthesisRequest) -> Result<ProviderAudio, ProviderError>;
}

/// Used when no provider endpoint is configured
pub struct UnconfiguredProvider;

#[async_trait]
impl SpeechProvider for UnconfiguredProvider {
    async fn synthesize(&self, _req: &SynthesisRequest) -> Result<ProviderAudio, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}

/// Polly-style request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderRequest<'a> {
    pub text: String,
    pub voice_id: &'a str,
    pub output_format: &'static str,
    pub engine: Engine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<&'a str>,
}

impl<'a> From<&'a SynthesisRequest> for ProviderRequest<'a> {
    fn from(req: &'a SynthesisRequest) -> Self {
        // Prosody changes turn the text into SSML
        let (text, text_type) = match ssml::prosody(req) {
            Some(markup) => (markup, Some("ssml")),
            None => (req.text.clone(), None),
        };
        Self {
            text,
            voice_id: &req.voice_id,
            output_format: req.output_format.as_str(),
            engine: req.engine,
            text_type,
            language_code: req.language_code.as_deref(),
            sample_rate: req.sample_rate.as_deref(),
        }
    }
}

/// Forwards requests to an HTTP speech endpoint
#[derive(Clone, Debug)]
pub struct HttpProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let url = url.into();
        info!("Speech provider endpoint: {}", url);
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SpeechProvider for HttpProvider {
    async fn synthesize(&self, req: &SynthesisRequest) -> Result<ProviderAudio, ProviderError> {
        let body = ProviderRequest::from(req);
        debug!(voice = body.voice_id, ssml = body.text_type.is_some(), "Forwarding synthesis request");

        let resp = self.http.post(&self.url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let headers = resp.headers();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let request_id = request_id(headers);

        let stream = resp
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Ok(ProviderAudio {
            content_type,
            request_id,
            body: stream,
        })
    }
}

/// First non-empty request id header the provider sent
pub fn request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}
