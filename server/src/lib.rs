pub mod config;
pub mod error;
pub mod provider;
pub mod validation;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use tracing::{info, warn};
use tts_core::{SynthesisRequest, Voice, VoiceCatalog};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::provider::SpeechProvider;
use crate::validation::validate_synthesis_request;

/// Header the proxy always sets on successful synthesis responses
pub const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

// Request bodies are small JSON documents; 3000 chars of text fit easily
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn SpeechProvider>,
    pub catalog: Arc<VoiceCatalog>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(provider: Arc<dyn SpeechProvider>, catalog: VoiceCatalog, config: ServerConfig) -> Self {
        Self {
            provider,
            catalog: Arc::new(catalog),
            config,
        }
    }
}

/// CORS configuration - environment-aware
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(false);

    match config.cors_allowed_origins {
        Some(ref allowed_origins) => {
            let origins: Vec<HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
                base.allow_origin(Any)
            } else {
                info!("CORS configured for {} origin(s)", origins.len());
                base.allow_origin(AllowOrigin::list(origins))
            }
        }
        None => {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
            base.allow_origin(Any)
        }
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let value = HeaderValue::from_str(&request_id);
    if let Ok(ref value) = value {
        request.headers_mut().insert("x-request-id", value.clone());
    }
    let mut response = next.run(request).await;
    if let Ok(value) = value {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Application routes, served both at the root and under `/api`.
///
/// Rate limiting, timeouts and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/voices", get(list_voices))
        .route("/synthesize", post(synthesize).fallback(method_not_allowed));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<Voice>> {
    Json(state.catalog.voices().to_vec())
}

/// Bare `OPTIONS` requests (no preflight headers) succeed with an empty
/// body; every other unsupported method is rejected.
async fn method_not_allowed(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        ApiError::MethodNotAllowed.into_response()
    }
}

pub async fn synthesize(
    State(state): State<AppState>,
    payload: Result<Json<SynthesisRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    validate_synthesis_request(&req, &state.catalog)?;

    info!(
        voice = %req.voice_id,
        engine = ?req.engine,
        chars = req.text.chars().count(),
        "Synthesizing speech"
    );
    let audio = state.provider.synthesize(&req).await?;
    let request_id = audio
        .request_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, audio.content_type)
        .header(header::CACHE_CONTROL, "no-store")
        .header(REQUEST_ID_HEADER, request_id)
        .body(Body::from_stream(audio.body))
        .map_err(|e| ApiError::InternalError(format!("Failed to build response: {e}")))
}
