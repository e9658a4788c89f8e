//! Summary stream orchestrator.
//!
//! Drives decoder → assembler → accumulator per incoming chunk, detects the
//! terminal signal, and owns the single-shot fallback taken when streaming
//! fails before producing anything usable.

use crate::error::Error;
use crate::gemini::GeminiClient;
use crate::prompt::{self, NO_TRANSCRIPT_PLACEHOLDER};
use crate::settings::Settings;
use crate::stream::{StreamAssembly, SummaryAccumulator, SummaryResult};
use crate::transcript::TranscriptItem;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events published over one summarization session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SummaryEvent {
    /// The growing result, re-published after every contributing record
    Update { result: SummaryResult },
    /// Terminal success with the final result
    Done { result: SummaryResult },
    /// Terminal failure; carries the best partial result when one exists
    Failed {
        message: String,
        partial: Option<SummaryResult>,
    },
}

/// Handle to one in-flight summarization. Dropping the receiver abandons
/// the session; its task finishes on its own.
pub struct SummarySession {
    pub id: u64,
    pub events: mpsc::UnboundedReceiver<SummaryEvent>,
}

pub struct Summarizer {
    settings: Settings,
    current: Arc<AtomicU64>,
}

impl Summarizer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a new session. A session already in flight keeps running but
    /// its remaining events are dropped, so consumers never see stale
    /// results.
    pub fn start(&self, items: &[TranscriptItem]) -> SummarySession {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();

        if prompt::transcript_text(items).trim().is_empty() {
            info!("Transcript is empty, skipping generation");
            let result = SummaryResult {
                headline: String::new(),
                summary: NO_TRANSCRIPT_PLACEHOLDER.to_string(),
            };
            let _ = tx.send(SummaryEvent::Update {
                result: result.clone(),
            });
            let _ = tx.send(SummaryEvent::Done { result });
            return SummarySession { id, events: rx };
        }

        let prompt = prompt::build_prompt(items);
        let gemini = GeminiClient::new(&self.settings);
        let current = self.current.clone();
        tokio::spawn(async move {
            run_session(id, current, gemini, prompt, tx).await;
        });

        SummarySession { id, events: rx }
    }
}

/// Send an event unless a newer session has superseded this one.
fn publish(
    tx: &mpsc::UnboundedSender<SummaryEvent>,
    current: &AtomicU64,
    id: u64,
    event: SummaryEvent,
) {
    if current.load(Ordering::SeqCst) == id {
        let _ = tx.send(event);
    }
}

async fn run_session(
    id: u64,
    current: Arc<AtomicU64>,
    gemini: GeminiClient,
    prompt: String,
    tx: mpsc::UnboundedSender<SummaryEvent>,
) {
    let mut assembly = StreamAssembly::new();
    let failure = drive_stream(&gemini, &prompt, &mut assembly, &tx, &current, id)
        .await
        .err();

    match failure {
        None => {
            info!(
                "Summary stream completed after {} updates",
                assembly.emissions()
            );
            publish(
                &tx,
                &current,
                id,
                SummaryEvent::Done {
                    result: assembly.current(),
                },
            );
        }
        Some(err) if assembly.emissions() > 0 => {
            warn!("Stream failed after partial progress: {}", err);
            publish(
                &tx,
                &current,
                id,
                SummaryEvent::Failed {
                    message: err.to_string(),
                    partial: Some(assembly.current()),
                },
            );
        }
        Some(err) if err.is_configuration() => {
            error!("Summarization is not configured: {}", err);
            publish(
                &tx,
                &current,
                id,
                SummaryEvent::Failed {
                    message: err.to_string(),
                    partial: None,
                },
            );
        }
        Some(err) => {
            warn!(
                "Streaming failed before any result: {}; retrying single-shot",
                err
            );
            match single_shot(&gemini, &prompt).await {
                Ok(result) => {
                    publish(
                        &tx,
                        &current,
                        id,
                        SummaryEvent::Update {
                            result: result.clone(),
                        },
                    );
                    publish(&tx, &current, id, SummaryEvent::Done { result });
                }
                Err(fallback_err) => {
                    error!("Single-shot fallback failed: {}", fallback_err);
                    publish(
                        &tx,
                        &current,
                        id,
                        SummaryEvent::Failed {
                            message: fallback_err.to_string(),
                            partial: None,
                        },
                    );
                }
            }
        }
    }
}

/// Consume the streaming response chunk by chunk, strictly in order.
async fn drive_stream(
    gemini: &GeminiClient,
    prompt: &str,
    assembly: &mut StreamAssembly,
    tx: &mpsc::UnboundedSender<SummaryEvent>,
    current: &AtomicU64,
    id: u64,
) -> Result<(), Error> {
    let response = gemini.stream_generate(prompt).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Transport(e.to_string()))?;
        let outcome = assembly.push_bytes(&chunk);
        for result in outcome.updates {
            publish(tx, current, id, SummaryEvent::Update { result });
        }
        if outcome.stop {
            debug!("Provider reported stop, finalizing");
            return Ok(());
        }
    }

    // transport end-of-stream without an explicit stop marker
    let outcome = assembly.finish();
    for result in outcome.updates {
        publish(tx, current, id, SummaryEvent::Update { result });
    }

    if assembly.emissions() == 0 {
        return Err(Error::MalformedResponse(
            "stream ended without a usable record".to_string(),
        ));
    }
    Ok(())
}

async fn single_shot(gemini: &GeminiClient, prompt: &str) -> Result<SummaryResult, Error> {
    let record = gemini.generate(prompt).await?;
    let mut accumulator = SummaryAccumulator::new();
    for delta in record.deltas() {
        accumulator.push_delta(delta);
    }
    if !accumulator.has_text() {
        return Err(Error::MalformedResponse(
            "no text in generation response".to_string(),
        ));
    }
    Ok(accumulator.current())
}
