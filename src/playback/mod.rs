//! Narrated-audio playback controller.
//!
//! Owns at most one audio artifact at a time and walks it through
//! generate → play/pause → end/stop, guaranteeing the artifact and the
//! position poller are released on every exit path. The audio stack and
//! the platform transport mirror sit behind the traits in `backend`, so
//! the state machine itself is driven purely by injected events.

pub mod backend;
pub mod sink;

pub use backend::{AudioBackend, MediaControls, NoopMediaControls, RemoteCommand};
pub use sink::RodioBackend;

use crate::error::Error;
use crate::narration::NarrationClient;
use crate::settings::Settings;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const POSITION_INTERVAL: Duration = Duration::from_millis(100);
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Generating,
    Playing,
    Paused,
    Ended,
    Errored,
}

/// Events published alongside the direct getters.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PlaybackEvent {
    State { state: PlaybackState },
    Position { position: f64, duration: Option<f64> },
    Error { message: String },
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    state: PlaybackState,
    position: f64,
    duration: Option<f64>,
}

struct Inner {
    backend: Box<dyn AudioBackend>,
    controls: Box<dyn MediaControls>,
    narration: NarrationClient,
    volume: f32,
    has_artifact: bool,
    poll: Option<JoinHandle<()>>,
}

/// Cheap-to-clone handle; every state-mutating call serializes on the
/// inner lock, so re-entrant transport mashing resolves to plain state
/// checks.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<tokio::sync::Mutex<Inner>>,
    snapshot: Arc<Mutex<Snapshot>>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(
        settings: &Settings,
        backend: Box<dyn AudioBackend>,
        mut controls: Box<dyn MediaControls>,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        controls.set_handler(remote_tx);

        let controller = Self {
            inner: Arc::new(tokio::sync::Mutex::new(Inner {
                backend,
                controls,
                narration: NarrationClient::new(settings),
                volume: settings.volume,
                has_artifact: false,
                poll: None,
            })),
            snapshot: Arc::new(Mutex::new(Snapshot {
                state: PlaybackState::Idle,
                position: 0.0,
                duration: None,
            })),
            events: events_tx,
        };
        controller.spawn_remote_loop(remote_rx);

        (controller, events_rx)
    }

    pub fn state(&self) -> PlaybackState {
        self.snapshot.lock().unwrap().state
    }

    /// Position in seconds.
    pub fn position(&self) -> f64 {
        self.snapshot.lock().unwrap().position
    }

    /// Duration in seconds, when the artifact's metadata yielded one.
    pub fn duration(&self) -> Option<f64> {
        self.snapshot.lock().unwrap().duration
    }

    /// Synthesize narration for `text` and prime it for playback. Ends in
    /// `Paused` at position zero on success; any failure releases whatever
    /// was partially created and returns to `Idle`.
    pub async fn generate(&self, text: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        self.generate_locked(&mut inner, text).await
    }

    /// The user-facing "speak" action: toggle while an artifact is live,
    /// generate-then-play otherwise.
    pub async fn play(&self, text: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        match self.state() {
            PlaybackState::Playing => {
                self.pause_locked(&mut inner);
                Ok(())
            }
            PlaybackState::Paused => {
                self.resume_locked(&mut inner);
                Ok(())
            }
            _ => {
                self.generate_locked(&mut inner, text).await?;
                self.start_locked(&mut inner)
            }
        }
    }

    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        self.pause_locked(&mut inner);
    }

    pub async fn resume(&self) {
        let mut inner = self.inner.lock().await;
        self.resume_locked(&mut inner);
    }

    /// Relocate playback to a 0–1 fraction of the known duration. No-op
    /// without an artifact or a usable duration.
    pub async fn seek(&self, fraction: f64) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        if !inner.has_artifact {
            return Ok(());
        }
        let Some(duration) = inner.backend.duration().filter(|d| !d.is_zero()) else {
            return Ok(());
        };

        let target = duration.mul_f64(fraction.clamp(0.0, 1.0));
        inner.backend.seek(target)?;

        let position = target.as_secs_f64();
        let duration = Some(duration.as_secs_f64());
        {
            let mut snapshot = self.snapshot.lock().unwrap();
            snapshot.position = position;
            snapshot.duration = duration;
        }
        let _ = self.events.send(PlaybackEvent::Position { position, duration });
        Ok(())
    }

    /// Release everything and return to `Idle`. Safe from any state,
    /// including `Idle` itself.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner, PlaybackState::Idle, None);
    }

    async fn generate_locked(&self, inner: &mut Inner, text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::Configuration(
                "there is no summary text to narrate".to_string(),
            ));
        }
        if inner.has_artifact {
            warn!("Narration already generated, ignoring request");
            return Ok(());
        }

        self.set_state(inner, PlaybackState::Generating);
        match self.build_artifact(inner, text).await {
            Ok(()) => {
                inner.has_artifact = true;
                self.set_state(inner, PlaybackState::Paused);
                self.publish_position(inner);
                Ok(())
            }
            Err(e) => {
                error!("Narration generation failed: {}", e);
                self.teardown(inner, PlaybackState::Idle, Some(&e));
                Err(e)
            }
        }
    }

    async fn build_artifact(&self, inner: &mut Inner, text: &str) -> Result<(), Error> {
        info!("Generating narration ({} chars)", text.len());
        let payload = inner.narration.synthesize(text).await?;
        inner.backend.load(payload).await?;

        match tokio::time::timeout(METADATA_TIMEOUT, inner.backend.wait_ready()).await {
            Ok(result) => result?,
            Err(_) => {
                let timeout = Error::Timeout("audio duration metadata".to_string());
                warn!("{}; continuing with best-effort duration", timeout);
            }
        }
        Ok(())
    }

    fn start_locked(&self, inner: &mut Inner) -> Result<(), Error> {
        if let Err(e) = inner.backend.play(inner.volume) {
            self.fail_locked(inner, &e);
            return Err(e);
        }
        self.set_state(inner, PlaybackState::Playing);
        self.spawn_poll(inner);
        Ok(())
    }

    fn pause_locked(&self, inner: &mut Inner) {
        if self.state() != PlaybackState::Playing {
            return;
        }
        inner.backend.pause();
        self.stop_poll(inner);
        self.set_state(inner, PlaybackState::Paused);
    }

    fn resume_locked(&self, inner: &mut Inner) {
        if self.state() != PlaybackState::Paused {
            return;
        }
        inner.backend.resume();
        self.set_state(inner, PlaybackState::Playing);
        self.spawn_poll(inner);
    }

    fn fail_locked(&self, inner: &mut Inner, error: &Error) {
        error!("Playback failed: {}", error);
        self.teardown(inner, PlaybackState::Errored, Some(error));
    }

    /// The single cleanup path every exit runs through: poller stopped,
    /// artifact released, position reset, mirror cleared.
    fn teardown(&self, inner: &mut Inner, state: PlaybackState, error: Option<&Error>) {
        self.stop_poll(inner);
        inner.backend.release();
        inner.has_artifact = false;
        {
            let mut snapshot = self.snapshot.lock().unwrap();
            snapshot.position = 0.0;
            snapshot.duration = None;
        }
        if let Some(e) = error {
            let _ = self.events.send(PlaybackEvent::Error {
                message: e.to_string(),
            });
        }
        self.set_state(inner, state);
    }

    fn set_state(&self, inner: &Inner, state: PlaybackState) {
        let previous = {
            let mut snapshot = self.snapshot.lock().unwrap();
            std::mem::replace(&mut snapshot.state, state)
        };
        if previous == state {
            return;
        }
        debug!("Playback state: {:?} -> {:?}", previous, state);

        // advisory mirror, never blocks the transition
        match state {
            PlaybackState::Playing => inner.controls.playing(),
            PlaybackState::Paused => inner.controls.paused(),
            PlaybackState::Idle | PlaybackState::Ended | PlaybackState::Errored => {
                inner.controls.cleared()
            }
            PlaybackState::Generating => {}
        }

        let _ = self.events.send(PlaybackEvent::State { state });
    }

    fn publish_position(&self, inner: &Inner) {
        let position = inner.backend.position().as_secs_f64();
        let duration = inner.backend.duration().map(|d| d.as_secs_f64());
        {
            let mut snapshot = self.snapshot.lock().unwrap();
            snapshot.position = position;
            snapshot.duration = duration;
        }
        let _ = self.events.send(PlaybackEvent::Position { position, duration });
    }

    fn spawn_poll(&self, inner: &mut Inner) {
        self.stop_poll(inner);
        let controller = self.clone();
        inner.poll = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(POSITION_INTERVAL);
            loop {
                interval.tick().await;
                if controller.poll_once().await {
                    break;
                }
            }
        }));
    }

    fn stop_poll(&self, inner: &mut Inner) {
        if let Some(handle) = inner.poll.take() {
            handle.abort();
        }
    }

    /// One poll tick. Returns true when polling should stop.
    async fn poll_once(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if self.state() != PlaybackState::Playing {
            return true;
        }
        if inner.backend.is_finished() {
            info!("Narration playback finished");
            // drop our own handle so teardown does not abort this task
            inner.poll.take();
            self.teardown(&mut inner, PlaybackState::Ended, None);
            return true;
        }
        self.publish_position(&inner);
        false
    }

    fn spawn_remote_loop(&self, mut remote: mpsc::UnboundedReceiver<RemoteCommand>) {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(command) = remote.recv().await {
                debug!("Remote transport command: {:?}", command);
                match command {
                    RemoteCommand::Play => controller.resume().await,
                    RemoteCommand::Pause => controller.pause().await,
                    RemoteCommand::Stop => controller.stop().await,
                }
            }
        });
    }
}
