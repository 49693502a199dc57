//! Playback controller.
//!
//! Wraps one media device and keeps a [`PlaybackState`] snapshot in sync with
//! it. Transport commands update the snapshot immediately; device events
//! (duration known, position advanced, ended) arrive on their own schedule
//! through a subscription that is installed on [`PlaybackController::load`]
//! and torn down when the device is replaced, unloaded or the controller is
//! dropped. Observers get every change through a watch channel.
//!
//! The crate ships no audio output of its own: the host application
//! implements [`MediaDevice`] for its player and hands it to `load`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::audio::AudioStore;
use crate::error::PlaybackError;

/// Read-only snapshot of the transport
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Seconds elapsed
    pub current_time: f64,
    /// Total seconds, 0 until the device reports it
    pub duration: f64,
    /// 0.0 to 1.0
    pub volume: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: 1.0,
        }
    }
}

impl PlaybackState {
    /// Fraction of the audio already played, in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 && self.duration.is_finite() {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Signals a media device emits while it owns a source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    DurationKnown(f64),
    TimeAdvanced(f64),
    Ended,
}

/// An audio-capable output the controller drives.
#[async_trait]
pub trait MediaDevice: Send {
    /// Point the device at a playable URL
    fn load(&mut self, url: &str);

    /// Start playback. May be refused (source not ready, autoplay policy).
    async fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn set_current_time(&mut self, secs: f64);

    fn set_volume(&mut self, level: f32);

    /// Start delivering events on a fresh channel
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DeviceEvent>;

    /// Stop delivering events
    fn unsubscribe(&mut self);
}

struct Loaded<D> {
    device: D,
    url: String,
    events: mpsc::UnboundedReceiver<DeviceEvent>,
}

pub struct PlaybackController<D: MediaDevice> {
    store: AudioStore,
    loaded: Option<Loaded<D>>,
    state: watch::Sender<PlaybackState>,
}

impl<D: MediaDevice> PlaybackController<D> {
    /// Create an empty controller resolving sources through `store`
    pub fn new(store: AudioStore) -> Self {
        let (state, _) = watch::channel(PlaybackState::default());
        Self {
            store,
            loaded: None,
            state,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Receive a snapshot on every change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn source_url(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.url.as_str())
    }

    /// Hand a device a new source. Any previous device is detached first;
    /// transport state starts over while the volume setting carries across.
    pub fn load(&mut self, mut device: D, url: impl Into<String>) {
        self.detach();

        let url = url.into();
        let volume = self.state().volume;
        device.load(&url);
        device.set_volume(volume);
        let events = device.subscribe();
        info!(%url, "audio source loaded");

        self.loaded = Some(Loaded {
            device,
            url,
            events,
        });
        self.reset();
    }

    /// Detach the device and return to the empty state
    pub fn unload(&mut self) {
        if self.detach() {
            self.reset();
        }
    }

    /// Pause when playing, otherwise try to start playback
    pub async fn toggle_play(&mut self) {
        let playing = self.state().is_playing;
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };

        if playing {
            loaded.device.pause();
            self.update(|s| s.is_playing = false);
            return;
        }

        let started = loaded.device.play().await;
        match started {
            Ok(()) => self.update(|s| s.is_playing = true),
            Err(e) => warn!(error = %e, "Error playing audio"),
        }
    }

    /// Jump to `secs`, clamped into the playable range
    pub fn seek(&mut self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        let duration = self.state().duration;
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };

        // Upper bound only applies once the device told us the duration
        let target = if duration > 0.0 {
            secs.clamp(0.0, duration)
        } else {
            secs.max(0.0)
        };
        loaded.device.set_current_time(target);
        self.update(|s| s.current_time = target);
    }

    pub fn set_volume(&mut self, level: f32) {
        if level.is_nan() {
            return;
        }
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        let level = level.clamp(0.0, 1.0);
        loaded.device.set_volume(level);
        self.update(|s| s.volume = level);
    }

    /// Back to the start, keeping play/pause as it is
    pub fn restart(&mut self) {
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        loaded.device.set_current_time(0.0);
        self.update(|s| s.current_time = 0.0);
    }

    /// Save the loaded audio into `dir` under a timestamped name.
    /// Returns `None` when nothing is loaded or the source was released.
    pub fn download(&self, dir: &Path) -> anyhow::Result<Option<PathBuf>> {
        let Some(loaded) = self.loaded.as_ref() else {
            return Ok(None);
        };
        let Some(resource) = self.store.resolve(&loaded.url) else {
            warn!(url = %loaded.url, "audio source already released, nothing to download");
            return Ok(None);
        };

        let name = download_file_name(chrono::Utc::now().timestamp_millis(), resource.extension());
        let path = dir.join(name);
        std::fs::write(&path, &resource.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), bytes = resource.bytes.len(), "audio downloaded");
        Ok(Some(path))
    }

    /// Apply one device signal to the snapshot
    pub fn handle_event(&mut self, event: DeviceEvent) {
        if self.loaded.is_none() {
            return;
        }
        debug!(?event, "device event");
        match event {
            DeviceEvent::DurationKnown(secs) => {
                let secs = if secs.is_finite() && secs > 0.0 { secs } else { 0.0 };
                self.update(|s| s.duration = secs);
            }
            DeviceEvent::TimeAdvanced(secs) => {
                if secs.is_finite() {
                    self.update(|s| s.current_time = secs.max(0.0));
                }
            }
            DeviceEvent::Ended => self.update(|s| {
                s.is_playing = false;
                s.current_time = 0.0;
            }),
        }
    }

    /// Apply every event the device has queued so far
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(event) = self.loaded.as_mut().and_then(|l| l.events.try_recv().ok()) else {
                break;
            };
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next device event and apply it.
    /// `None` when nothing is loaded or the device stopped sending.
    pub async fn next_event(&mut self) -> Option<DeviceEvent> {
        let event = self.loaded.as_mut()?.events.recv().await?;
        self.handle_event(event);
        Some(event)
    }

    fn detach(&mut self) -> bool {
        match self.loaded.take() {
            Some(mut old) => {
                old.device.pause();
                old.device.unsubscribe();
                debug!(url = %old.url, "audio source detached");
                true
            }
            None => false,
        }
    }

    fn reset(&self) {
        self.update(|s| {
            *s = PlaybackState {
                volume: s.volume,
                ..PlaybackState::default()
            }
        });
    }

    fn update(&self, f: impl FnOnce(&mut PlaybackState)) {
        self.state.send_if_modified(|s| {
            let before = *s;
            f(s);
            *s != before
        });
    }
}

impl<D: MediaDevice> Drop for PlaybackController<D> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// `tts-audio-<millis>.<ext>`
pub fn download_file_name(timestamp_millis: i64, extension: &str) -> String {
    format!("tts-audio-{timestamp_millis}.{extension}")
}

/// Render seconds as `m:ss`
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let whole = secs.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
