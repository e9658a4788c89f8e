//! Command-line front end: paste a video link, read the summary as it
//! streams in, optionally listen to it.

use clap::Parser;
use log::{debug, error, info, warn};
use recap::playback::{
    NoopMediaControls, PlaybackController, PlaybackEvent, PlaybackState, RodioBackend,
};
use recap::prompt;
use recap::settings::Settings;
use recap::stream::SummaryResult;
use recap::summarizer::{Summarizer, SummaryEvent};
use recap::transcript::TranscriptClient;
use recap::video;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(name = "recap", about = "Paste a video link, get a streamed summary you can listen to")]
struct Cli {
    /// Video link or bare video id
    video: String,

    /// Path to the settings JSON file
    #[arg(long, default_value = "recap.json")]
    settings: PathBuf,

    /// Read the finished summary aloud
    #[arg(long)]
    speak: bool,

    /// Narration voice
    #[arg(long)]
    voice: Option<String>,

    /// Output device name for playback
    #[arg(long)]
    output_device: Option<String>,

    /// Playback volume, 0.0 to 2.0
    #[arg(long)]
    volume: Option<f32>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load(&cli.settings).map_err(anyhow::Error::msg)?;
    if let Some(voice) = cli.voice {
        settings.voice = voice;
    }
    if let Some(device) = cli.output_device {
        settings.output_device = Some(device);
    }
    if let Some(volume) = cli.volume {
        settings.volume = volume;
    }
    let settings = settings.normalized();

    let video = video::canonicalize(&cli.video).map_err(anyhow::Error::msg)?;
    info!("Summarizing {}", video.url);

    let transcript = TranscriptClient::new(&settings);
    let response = transcript.fetch(&video.url).await?;
    if let Some(credits) = response.credits_remaining {
        debug!("Transcript credits remaining: {}", credits);
    }

    let summarizer = Summarizer::new(&settings);
    let mut session = summarizer.start(&response.transcript);

    let mut renderer = ProgressRenderer::new();
    let result = loop {
        let Some(event) = session.events.recv().await else {
            anyhow::bail!("summary session ended without a result");
        };
        match event {
            SummaryEvent::Update { result } => renderer.render(&result),
            SummaryEvent::Done { result } => {
                renderer.render(&result);
                renderer.finish();
                break result;
            }
            SummaryEvent::Failed { message, partial } => {
                renderer.finish();
                if partial.is_some() {
                    warn!("Keeping the partial summary shown above");
                }
                anyhow::bail!("{}", message);
            }
        }
    };

    if cli.speak {
        speak(&settings, &result).await?;
    }
    Ok(())
}

/// Prints the summary as it grows, headline first. Updates normally only
/// append text, so each one costs a suffix write; when a late marker
/// reshapes the text the whole summary is printed again.
struct ProgressRenderer {
    printed: String,
    headline_shown: bool,
}

impl ProgressRenderer {
    fn new() -> Self {
        Self {
            printed: String::new(),
            headline_shown: false,
        }
    }

    fn render(&mut self, result: &SummaryResult) {
        if !self.headline_shown && !result.headline.is_empty() {
            println!("{}", result.headline);
            println!();
            self.headline_shown = true;
        }
        if result.summary.starts_with(&self.printed) {
            print!("{}", &result.summary[self.printed.len()..]);
        } else {
            println!();
            print!("{}", result.summary);
        }
        let _ = std::io::stdout().flush();
        self.printed = result.summary.clone();
    }

    fn finish(&mut self) {
        if !self.printed.is_empty() {
            println!();
        }
    }
}

async fn speak(settings: &Settings, result: &SummaryResult) -> anyhow::Result<()> {
    let narration_text = prompt::plain_text(&result.summary);
    let backend = RodioBackend::new(settings.output_device.clone());
    let (controller, mut events) = PlaybackController::new(
        settings,
        Box::new(backend),
        Box::new(NoopMediaControls::default()),
    );

    controller.play(&narration_text).await?;
    println!("Narrating. Commands: p = play/pause, s <0-1> = seek, q = quit");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut last_error = None;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    PlaybackEvent::State { state } => match state {
                        PlaybackState::Ended => {
                            println!();
                            info!("Narration finished");
                            break;
                        }
                        PlaybackState::Errored => {
                            println!();
                            let message = last_error
                                .take()
                                .unwrap_or_else(|| "narration playback failed".to_string());
                            anyhow::bail!("{}", message);
                        }
                        PlaybackState::Idle => break,
                        _ => {}
                    },
                    PlaybackEvent::Position { position, duration } => {
                        print_position(position, duration);
                    }
                    PlaybackEvent::Error { message } => {
                        last_error = Some(message);
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "q" => {
                        controller.stop().await;
                        break;
                    }
                    "p" => controller.play(&narration_text).await?,
                    "" => {}
                    other => {
                        if let Some(fraction) = other.strip_prefix("s ") {
                            match fraction.trim().parse::<f64>() {
                                Ok(fraction) => controller.seek(fraction).await?,
                                Err(_) => warn!("Seek takes a number between 0 and 1"),
                            }
                        } else {
                            warn!("Unknown command '{}'", other);
                        }
                    }
                }
            }
        }
    }
    println!();
    Ok(())
}

fn print_position(position: f64, duration: Option<f64>) {
    match duration {
        Some(duration) => print!("\r{} / {}  ", format_clock(position), format_clock(duration)),
        None => print!("\r{}  ", format_clock(position)),
    }
    let _ = std::io::stdout().flush();
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
