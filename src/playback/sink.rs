use crate::error::Error;
use crate::playback::backend::AudioBackend;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};
use log::{debug, info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
enum SinkCommand {
    Play { volume: f32 },
    Pause,
    Resume,
    Seek { position: Duration },
    Stop,
}

/// Position and metadata shared between the playback thread and the async
/// side. Millisecond resolution is plenty for transport display.
#[derive(Default)]
struct SharedPlayback {
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
    finished: AtomicBool,
}

struct Artifact {
    commands: mpsc::Sender<SinkCommand>,
    shared: Arc<SharedPlayback>,
    ready: Option<tokio::sync::oneshot::Receiver<Result<(), Error>>>,
}

/// `AudioBackend` on top of a rodio sink. The sink and its output stream
/// are not Send, so each loaded artifact gets a dedicated thread that owns
/// them and takes commands over a channel; the thread doubles as the
/// position refresher between commands.
pub struct RodioBackend {
    device_name: Option<String>,
    artifact: Option<Artifact>,
}

impl RodioBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            artifact: None,
        }
    }

    fn send(&self, command: SinkCommand) -> Result<(), Error> {
        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| Error::Playback("no audio artifact loaded".to_string()))?;
        artifact
            .commands
            .send(command)
            .map_err(|_| Error::Playback("playback thread is gone".to_string()))
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn load(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.release();

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let shared = Arc::new(SharedPlayback::default());

        let thread_shared = shared.clone();
        let device_name = self.device_name.clone();
        std::thread::spawn(move || {
            playback_thread(payload, device_name, cmd_rx, thread_shared, ready_tx)
        });

        self.artifact = Some(Artifact {
            commands: cmd_tx,
            shared,
            ready: Some(ready_rx),
        });
        Ok(())
    }

    async fn wait_ready(&mut self) -> Result<(), Error> {
        let Some(artifact) = self.artifact.as_mut() else {
            return Err(Error::Playback("no audio artifact loaded".to_string()));
        };
        let Some(ready) = artifact.ready.take() else {
            return Ok(());
        };

        match ready.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.release();
                Err(e)
            }
            Err(_) => {
                self.release();
                Err(Error::Playback(
                    "playback thread exited during setup".to_string(),
                ))
            }
        }
    }

    fn duration(&self) -> Option<Duration> {
        let artifact = self.artifact.as_ref()?;
        let ms = artifact.shared.duration_ms.load(Ordering::SeqCst);
        (ms > 0).then(|| Duration::from_millis(ms))
    }

    fn play(&mut self, volume: f32) -> Result<(), Error> {
        self.send(SinkCommand::Play { volume })
    }

    fn pause(&mut self) {
        let _ = self.send(SinkCommand::Pause);
    }

    fn resume(&mut self) {
        let _ = self.send(SinkCommand::Resume);
    }

    fn seek(&mut self, position: Duration) -> Result<(), Error> {
        self.send(SinkCommand::Seek { position })
    }

    fn position(&self) -> Duration {
        self.artifact
            .as_ref()
            .map(|a| Duration::from_millis(a.shared.position_ms.load(Ordering::SeqCst)))
            .unwrap_or(Duration::ZERO)
    }

    fn is_finished(&self) -> bool {
        self.artifact
            .as_ref()
            .map(|a| a.shared.finished.load(Ordering::SeqCst))
            .unwrap_or(true)
    }

    fn release(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            // the thread tears the sink down and exits once it sees this
            let _ = artifact.commands.send(SinkCommand::Stop);
            debug!("Released audio artifact");
        }
    }
}

/// Owns the output stream and sink for one artifact. Exits when told to
/// stop or when the command channel closes.
fn playback_thread(
    payload: Vec<u8>,
    device_name: Option<String>,
    commands: mpsc::Receiver<SinkCommand>,
    shared: Arc<SharedPlayback>,
    ready: tokio::sync::oneshot::Sender<Result<(), Error>>,
) {
    let (_stream, sink) = match prepare_sink(device_name.as_deref(), payload, &shared) {
        Ok(pair) => pair,
        Err(e) => {
            shared.finished.store(true, Ordering::SeqCst);
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(SinkCommand::Play { volume }) => {
                sink.set_volume(volume);
                sink.play();
            }
            Ok(SinkCommand::Pause) => sink.pause(),
            Ok(SinkCommand::Resume) => sink.play(),
            Ok(SinkCommand::Seek { position }) => {
                if let Err(e) = sink.try_seek(position) {
                    warn!("Seek failed: {}", e);
                }
            }
            Ok(SinkCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        shared
            .position_ms
            .store(sink.get_pos().as_millis() as u64, Ordering::SeqCst);
        if sink.empty() {
            shared.finished.store(true, Ordering::SeqCst);
        }
    }

    sink.stop();
    shared.finished.store(true, Ordering::SeqCst);
}

fn prepare_sink(
    device_name: Option<&str>,
    payload: Vec<u8>,
    shared: &SharedPlayback,
) -> Result<(OutputStream, Sink), Error> {
    let mut duration = probe_wav_duration(&payload);

    let (stream, handle) = open_output(device_name)?;
    let sink = Sink::try_new(&handle)
        .map_err(|e| Error::Playback(format!("failed to create audio sink: {}", e)))?;

    let decoder = Decoder::new(Cursor::new(payload))
        .map_err(|e| Error::Playback(format!("failed to decode audio payload: {}", e)))?;
    if duration.is_none() {
        duration = decoder.total_duration();
    }
    if let Some(d) = duration {
        shared
            .duration_ms
            .store(d.as_millis() as u64, Ordering::SeqCst);
    }

    // parked until the controller starts playback
    sink.pause();
    sink.append(decoder);

    Ok((stream, sink))
}

fn open_output(device_name: Option<&str>) -> Result<(OutputStream, OutputStreamHandle), Error> {
    if let Some(name) = device_name {
        let host = cpal::default_host();
        let device = host
            .output_devices()
            .map_err(|e| Error::Playback(format!("failed to enumerate output devices: {}", e)))?
            .find(|d| {
                d.name()
                    .map(|n| n.contains(name) || name.contains(&n))
                    .unwrap_or(false)
            });

        if let Some(device) = device {
            info!("Using output device: {:?}", device.name());
            return OutputStream::try_from_device(&device)
                .map_err(|e| Error::Playback(format!("failed to open device '{}': {}", name, e)));
        }
        warn!("Output device '{}' not found, using default", name);
    }

    OutputStream::try_default()
        .map_err(|e| Error::Playback(format!("failed to open default output device: {}", e)))
}

/// WAV payloads carry the duration in their header; read it without
/// decoding. Other formats fall back to the decoder's own metadata.
fn probe_wav_duration(payload: &[u8]) -> Option<Duration> {
    let reader = hound::WavReader::new(Cursor::new(payload)).ok()?;
    let spec = reader.spec();
    let frames = reader.duration();
    if frames == 0 || spec.sample_rate == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64))
}
