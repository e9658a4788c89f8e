use crate::error::Error;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Transport commands arriving from a platform-level media surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    Stop,
}

/// A playable audio artifact. The controller only ever holds one and drives
/// it exclusively through this interface, so the state machine itself stays
/// independent of any concrete audio stack.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Decode a raw audio payload into a playable artifact, replacing any
    /// artifact still held.
    async fn load(&mut self, payload: Vec<u8>) -> Result<(), Error>;

    /// Suspend until the artifact is ready to play and its duration
    /// metadata, if the payload carries any, is known.
    async fn wait_ready(&mut self) -> Result<(), Error>;

    fn duration(&self) -> Option<Duration>;

    /// Start (or restart) playback from the current position.
    fn play(&mut self, volume: f32) -> Result<(), Error>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), Error>;

    fn position(&self) -> Duration;

    /// True once the artifact has played to its natural end.
    fn is_finished(&self) -> bool;

    /// Release the artifact and every backing resource. Safe to call with
    /// nothing loaded.
    fn release(&mut self);
}

/// Advisory mirror of the playback state onto a platform "now playing"
/// surface. Every method is best-effort: implementations log failures and
/// never report them back, so a broken mirror cannot block a transition.
pub trait MediaControls: Send + Sync {
    fn playing(&self);
    fn paused(&self);
    fn cleared(&self);

    /// Register the channel that inbound platform transport controls
    /// (lock-screen or notification play/pause/stop) are routed through.
    fn set_handler(&mut self, sender: mpsc::UnboundedSender<RemoteCommand>);
}

/// Mirror that goes nowhere, for headless use.
#[derive(Default)]
pub struct NoopMediaControls;

impl MediaControls for NoopMediaControls {
    fn playing(&self) {}
    fn paused(&self) {}
    fn cleared(&self) {}
    fn set_handler(&mut self, _sender: mpsc::UnboundedSender<RemoteCommand>) {}
}
