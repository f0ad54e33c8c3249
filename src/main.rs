use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use voicelink::voice::{AudioCapture, AudioPlayback, FrameQueue};
use voicelink::{Config, Session, SessionEvent, StopMode};

/// Voicelink - stream your voice to a remote assistant and hear it answer
#[derive(Parser)]
#[command(name = "voicelink", version, about)]
struct Cli {
    /// WebSocket URL of the transcription service
    #[arg(short, long, env = "VOICELINK_SERVER_URL")]
    url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voicelink=info",
        1 => "info,voicelink=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
        };
    }

    let mut config = Config::load()?;
    if let Some(url) = cli.url {
        config.server_url = url;
    }

    run_session(&config).await
}

/// Run one capture/playback session against the configured service
#[allow(clippy::future_not_send)]
async fn run_session(config: &Config) -> anyhow::Result<()> {
    println!("Connecting to {} ...", config.server_url);
    println!("Press Enter to stop and process, or type q + Enter to discard.\n");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (control_tx, mut control_rx) = mpsc::channel::<StopMode>(1);

    let playback = AudioPlayback::new(config.playback_sample_rate)?;
    let mut session = Session::start(config, Box::new(playback), event_tx).await?;

    // First stdin line decides how the session stops
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        if let Ok(Some(line)) = lines.next_line().await {
            let mode = if line.trim().eq_ignore_ascii_case("q") {
                StopMode::Discard
            } else {
                StopMode::Process
            };
            let _ = control_tx.send(mode).await;
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let result = session.run(&mut control_rx).await;
    drop(session);
    let _ = printer.await;

    result?;
    Ok(())
}

/// Render a session event for the terminal
fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Connected => println!("[connected] speak now"),
        SessionEvent::Disconnected => println!("\n[disconnected]"),
        SessionEvent::Status(text) => println!("[status] {text}"),
        SessionEvent::TranscriptPartial(text) => println!("  ... {text}"),
        SessionEvent::TranscriptFinal(text) => println!("  you: {text}"),
        SessionEvent::TranscriptComplete(text) => println!("\n[transcript] {text}\n"),
        SessionEvent::AssistantDelta(text) => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        SessionEvent::AssistantComplete => println!(),
        SessionEvent::ServerError(message) => println!("[server error] {message}"),
        SessionEvent::UnitText { id, text } => {
            tracing::debug!(id, text = %text, "sentence announced");
        }
        SessionEvent::UnitStarted { id } => tracing::debug!(id, "playing sentence"),
        SessionEvent::UnitEnded { id } => tracing::debug!(id, "finished sentence"),
        SessionEvent::AllPlaybackComplete => println!("[playback complete]"),
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let frames = Arc::new(FrameQueue::new(256));
    let mut capture = AudioCapture::new(Arc::clone(&frames))?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut samples = Vec::new();
        while let Some(frame) = frames.try_pop() {
            samples.extend(frame.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])));
        }
        let energy = calculate_rms(&samples);
        let peak = samples
            .iter()
            .map(|s| f32::from(*s).abs() / 32768.0)
            .fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]",
            i + 1
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Calculate RMS energy of i16 PCM samples, normalized to [0, 1]
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples
        .iter()
        .map(|s| {
            let normalized = f32::from(*s) / 32768.0;
            normalized * normalized
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let config = Config::load()?;
    let playback = AudioPlayback::new(config.playback_sample_rate)?;

    let sample_rate = config.playback_sample_rate;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());

    playback.play_samples(&samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}
