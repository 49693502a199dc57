//! Form session: results, alerts and resource release

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::*;
use tokio::sync::mpsc;
use tts_client::{form::SUCCESS_MESSAGE, Alert, GenerateOutcome, SpeechForm};
use tts_core::{
    AudioStore, DeviceEvent, Engine, Field, MediaDevice, PlaybackController, PlaybackError,
    SynthesisRequest,
};

#[tokio::test]
async fn test_generate_replaces_and_releases_previous_audio() {
    let url = spawn(backend("stream", Backend::default())).await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));
    form.text = "  Hello world  ".to_string();
    form.engine = Engine::Neural;

    assert_eq!(form.generate().await, GenerateOutcome::Generated);
    assert_eq!(form.alert(), Some(&Alert::Success(SUCCESS_MESSAGE.to_string())));
    let first_url = form.result().unwrap().url().to_string();
    assert_eq!(store.live_count(), 1);

    assert_eq!(form.generate().await, GenerateOutcome::Generated);
    let second_url = form.result().unwrap().url().to_string();
    assert_ne!(first_url, second_url);
    assert!(store.resolve(&first_url).is_none());
    assert_eq!(store.live_count(), 1);

    form.close();
    assert!(form.result().is_none());
    assert_eq!(store.live_count(), 0);
}

#[tokio::test]
async fn test_request_reflects_fields() {
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client("http://127.0.0.1:1", &store));
    form.text = "  padded  ".to_string();
    form.voice_id = "Brian".to_string();
    form.speech_rate = 1.5;
    form.pitch = -2;

    let req = form.request();
    assert_eq!(req.text, "padded");
    assert_eq!(req.voice_id, "Brian");
    assert_eq!(req.speech_rate, "1.5");
    assert_eq!(req.pitch, "-2");
}

#[tokio::test]
async fn test_invalid_text_sets_field_error() {
    let state = Backend::default();
    let url = spawn(backend("stream", state.clone())).await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));

    form.text = "   ".to_string();
    assert!(!form.can_generate());
    assert_eq!(form.generate().await, GenerateOutcome::Invalid);
    assert_eq!(form.field_error().map(|e| e.field), Some(Field::Text));
    assert!(form.alert().is_none());

    form.text = "x".repeat(3001);
    assert_eq!(form.character_count(), 3001);
    assert!(!form.can_generate());
    assert_eq!(form.generate().await, GenerateOutcome::Invalid);
    assert!(form.field_error().unwrap().message.contains("3000"));

    form.text = "fine".to_string();
    form.voice_id = "Nobody".to_string();
    assert_eq!(form.generate().await, GenerateOutcome::Invalid);
    assert_eq!(form.field_error().map(|e| e.field), Some(Field::Voice));

    assert_eq!(state.hits(), 0);
}

#[tokio::test]
async fn test_provider_failure_keeps_previous_audio() {
    let url = spawn(backend("flaky", Backend::default())).await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));
    form.text = "Hello".to_string();

    assert_eq!(form.generate().await, GenerateOutcome::Generated);
    let kept = form.result().unwrap().url().to_string();

    assert_eq!(form.generate().await, GenerateOutcome::Failed);
    assert_eq!(
        form.alert(),
        Some(&Alert::Error("upstream failure".to_string()))
    );
    assert_eq!(form.result().unwrap().url(), kept);
    assert!(store.resolve(&kept).is_some());

    form.dismiss_alert();
    assert!(form.alert().is_none());
}

#[tokio::test]
async fn test_dropping_the_form_releases_audio() {
    let url = spawn(backend("stream", Backend::default())).await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));
    form.text = "Hello".to_string();

    assert_eq!(form.generate().await, GenerateOutcome::Generated);
    assert_eq!(store.live_count(), 1);
    drop(form);
    assert_eq!(store.live_count(), 0);
}

#[tokio::test]
async fn test_busy_generate_keeps_messages() {
    let state = Backend::default();
    let url = spawn(backend("slow", state.clone())).await;
    let store = AudioStore::new();
    let shared = client(&url, &store);
    let mut form = SpeechForm::new(shared.clone());
    form.text = "Hello".to_string();

    form.voice_id = "Nobody".to_string();
    assert_eq!(form.generate().await, GenerateOutcome::Invalid);
    let field_error = form.field_error().cloned();
    assert_eq!(field_error.as_ref().map(|e| e.field), Some(Field::Voice));

    let pending = tokio::spawn(async move {
        shared
            .synthesize(&SynthesisRequest::new("Elsewhere", "Joanna"))
            .await
    });
    state.entered.notified().await;

    form.voice_id = "Joanna".to_string();
    assert_eq!(form.generate().await, GenerateOutcome::Ignored);
    assert_eq!(form.field_error().cloned(), field_error);
    assert!(form.alert().is_none());
    assert!(form.result().is_none());

    state.release.notify_one();
    assert!(pending.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_transport_failure_sets_generic_alert() {
    let url = dead_url().await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));
    form.text = "Hello".to_string();

    assert_eq!(form.generate().await, GenerateOutcome::Failed);
    match form.alert() {
        Some(Alert::Error(msg)) => assert!(msg.contains("Could not reach")),
        other => panic!("expected error alert, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_voices_keeps_or_resets_selection() {
    let url = spawn(backend("stream", Backend::default())).await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));
    assert_eq!(form.voice_id, "Joanna");

    form.refresh_voices().await;
    assert_eq!(form.voices().len(), 2);
    assert_eq!(form.voice_id, "Hans");

    form.voice_id = "Marlene".to_string();
    form.refresh_voices().await;
    assert_eq!(form.voice_id, "Marlene");
}

// Minimal device that records what the controller asked for
#[derive(Clone, Default)]
struct RecordingDevice {
    loaded: Arc<Mutex<Vec<String>>>,
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<DeviceEvent>>>>,
}

#[async_trait]
impl MediaDevice for RecordingDevice {
    fn load(&mut self, url: &str) {
        self.loaded.lock().unwrap().push(url.to_string());
    }

    async fn play(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn set_current_time(&mut self, _secs: f64) {}

    fn set_volume(&mut self, _level: f32) {}

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DeviceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        rx
    }

    fn unsubscribe(&mut self) {
        self.sender.lock().unwrap().take();
    }
}

#[tokio::test]
async fn test_generated_audio_plays_and_downloads() {
    let url = spawn(backend("stream", Backend::default())).await;
    let store = AudioStore::new();
    let mut form = SpeechForm::new(client(&url, &store));
    let mut player = PlaybackController::new(store.clone());
    form.text = "Play me".to_string();

    assert_eq!(form.generate().await, GenerateOutcome::Generated);
    let device = RecordingDevice::default();
    let source = form.result().unwrap().url().to_string();
    player.load(device.clone(), source.clone());
    assert_eq!(*device.loaded.lock().unwrap(), vec![source.clone()]);

    player.toggle_play().await;
    let sender = device.sender.lock().unwrap().clone().unwrap();
    sender.send(DeviceEvent::DurationKnown(2.0)).unwrap();
    sender.send(DeviceEvent::TimeAdvanced(1.0)).unwrap();
    player.drain_events();
    assert!(player.state().is_playing);
    assert_eq!(player.state().current_time, 1.0);

    let dir = std::env::temp_dir().join(format!("tts-form-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let saved = player.download(&dir).unwrap().unwrap();
    assert_eq!(std::fs::read(&saved).unwrap(), CHUNKS.concat());
    std::fs::remove_dir_all(&dir).unwrap();

    // A new generation revokes the URL the player still points at
    assert_eq!(form.generate().await, GenerateOutcome::Generated);
    assert_eq!(player.download(std::path::Path::new(".")).unwrap(), None);
}
