//! Common utilities for client integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tts_client::{ClientConfig, SynthesisClient};
use tts_core::{AudioStore, Gender, Voice};

pub const CHUNKS: [&[u8]; 3] = [b"ID3\x04", b"\x00\x01\x02", b"\xff\xfb\x90"];

#[derive(Clone, Default)]
pub struct Backend {
    pub hits: Arc<AtomicUsize>,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Backend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL nothing listens on
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn client(base_url: &str, store: &AudioStore) -> SynthesisClient {
    let mut config = ClientConfig::new(base_url);
    config.request_timeout_secs = 5;
    SynthesisClient::new(config, store.clone()).unwrap()
}

async fn streamed(State(b): State<Backend>) -> Response {
    b.hits.fetch_add(1, Ordering::SeqCst);
    let stream = async_stream::stream! {
        for chunk in CHUNKS {
            tokio::time::sleep(Duration::from_millis(5)).await;
            yield Ok::<_, std::io::Error>(Bytes::from_static(chunk));
        }
    };
    Response::builder()
        .header("content-type", "audio/mpeg")
        .header("x-amzn-requestid", "req-123")
        .body(Body::from_stream(stream))
        .unwrap()
}

async fn untyped(State(b): State<Backend>) -> Response {
    b.hits.fetch_add(1, Ordering::SeqCst);
    Response::builder()
        .header("x-amz-request-id", "fallback-id")
        .body(Body::from(&b"raw"[..]))
        .unwrap()
}

async fn failing(State(b): State<Backend>) -> impl IntoResponse {
    b.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure")
}

async fn rejecting(State(b): State<Backend>) -> impl IntoResponse {
    b.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Invalid voice ID" })),
    )
}

async fn broken_stream(State(b): State<Backend>) -> Response {
    b.hits.fetch_add(1, Ordering::SeqCst);
    let stream = async_stream::stream! {
        yield Ok::<_, std::io::Error>(Bytes::from_static(b"partial"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        yield Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "provider hung up"));
    };
    Response::builder()
        .header("content-type", "audio/mpeg")
        .body(Body::from_stream(stream))
        .unwrap()
}

// Error status whose body is cut off mid-stream
async fn broken_failure(State(b): State<Backend>) -> Response {
    b.hits.fetch_add(1, Ordering::SeqCst);
    let stream = async_stream::stream! {
        yield Ok::<_, std::io::Error>(Bytes::from_static(b"upstream fa"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        yield Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "provider hung up"));
    };
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Body::from_stream(stream))
        .unwrap()
}

// First call succeeds, every later call fails
async fn flaky(state: State<Backend>) -> Response {
    if state.hits() == 0 {
        streamed(state).await
    } else {
        state.hits.fetch_add(1, Ordering::SeqCst);
        (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure").into_response()
    }
}

async fn slow(State(b): State<Backend>) -> Response {
    b.hits.fetch_add(1, Ordering::SeqCst);
    b.entered.notify_one();
    b.release.notified().await;
    Response::builder()
        .header("content-type", "audio/mpeg")
        .body(Body::from(&b"late"[..]))
        .unwrap()
}

async fn voices() -> Json<Vec<Voice>> {
    Json(vec![
        Voice::new("Hans", Gender::Male, "German", "de-DE"),
        Voice::new("Marlene", Gender::Female, "German", "de-DE"),
    ])
}

/// Backend whose `/synthesize` is served by the named behaviour
pub fn backend(kind: &str, state: Backend) -> Router {
    let synth = match kind {
        "stream" => post(streamed),
        "untyped" => post(untyped),
        "fail" => post(failing),
        "reject" => post(rejecting),
        "broken" => post(broken_stream),
        "broken_failure" => post(broken_failure),
        "slow" => post(slow),
        "flaky" => post(flaky),
        other => panic!("unknown backend kind {other}"),
    };
    Router::new()
        .route("/synthesize", synth)
        .route("/voices", get(voices))
        .with_state(state)
}
