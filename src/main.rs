use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rocket_assistant::audio::{
    AudioCapture, AudioPlayback, DecodedAudio, PlaybackSink, list_input_devices,
};
use rocket_assistant::config::Overrides;
use rocket_assistant::llm::OllamaGenerator;
use rocket_assistant::orchestrator::ConversationOrchestrator;
use rocket_assistant::recognizer::{create_transcriber, event_channel, spawn_recognition};
use rocket_assistant::tts::{MimicSynthesizer, SpeechSynthesizer};
use rocket_assistant::Config;

/// Rocket - wake-word voice assistant for the Rocket robot
#[derive(Parser)]
#[command(name = "rocket", version, about)]
struct Cli {
    /// Wake phrase that activates command capture
    #[arg(short, long, env = "ROCKET_WAKE_PHRASE")]
    wake_phrase: Option<String>,

    /// Silence timeout in seconds before a command is complete
    #[arg(short = 't', long, env = "ROCKET_SILENCE_TIMEOUT")]
    silence_timeout: Option<f64>,

    /// Hard cap on capture duration in seconds
    #[arg(long, env = "ROCKET_MAX_CAPTURE")]
    max_capture: Option<f64>,

    /// Directory of wake acknowledgment sounds (.wav/.mp3)
    #[arg(long, env = "ROCKET_WAKE_SOUND_DIR")]
    wake_sound_dir: Option<PathBuf>,

    /// Audio input device name (see `rocket list-devices`)
    #[arg(short, long, env = "ROCKET_MIC_DEVICE")]
    device: Option<String>,

    /// Path to the speech recognition model directory
    #[arg(long, env = "ROCKET_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// LLM endpoint base URL
    #[arg(short = 'u', long, env = "ROCKET_LLM_URL")]
    llm_url: Option<String>,

    /// LLM model name
    #[arg(short = 'm', long, env = "ROCKET_LLM_MODEL")]
    llm_model: Option<String>,

    /// LLM request timeout in seconds
    #[arg(long, env = "ROCKET_LLM_TIMEOUT")]
    llm_timeout: Option<u64>,

    /// How long the LLM server should keep the model loaded (e.g. "10m")
    #[arg(long, env = "ROCKET_LLM_KEEP_ALIVE")]
    llm_keep_alive: Option<String>,

    /// Custom system prompt for the LLM
    #[arg(long, env = "ROCKET_SYSTEM_PROMPT")]
    system_prompt: Option<String>,

    /// TTS endpoint base URL
    #[arg(long, env = "ROCKET_TTS_URL")]
    tts_url: Option<String>,

    /// TTS voice identifier
    #[arg(long, env = "ROCKET_TTS_VOICE")]
    tts_voice: Option<String>,

    /// TTS request timeout in seconds
    #[arg(long, env = "ROCKET_TTS_TIMEOUT")]
    tts_timeout: Option<u64>,

    /// Disable text-to-speech output (replies stay text-only)
    #[arg(long, env = "ROCKET_DISABLE_TTS")]
    no_tts: bool,

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
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// List available audio input devices
    ListDevices,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,rocket_assistant=info",
        1 => "info,rocket_assistant=debug",
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
    if let Some(cmd) = &cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&cli, *duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&cli, text).await,
            Command::ListDevices => list_devices(),
        };
    }

    let config = Config::load(overrides_from(cli))?;
    tracing::debug!(?config, "loaded configuration");

    run_assistant(config).await
}

/// Fold CLI flags into config overrides
fn overrides_from(cli: Cli) -> Overrides {
    Overrides {
        wake_phrase: cli.wake_phrase,
        silence_timeout_secs: cli.silence_timeout,
        max_capture_secs: cli.max_capture,
        wake_sound_dir: cli.wake_sound_dir,
        input_device: cli.device,
        model_path: cli.model_path,
        llm_url: cli.llm_url,
        llm_model: cli.llm_model,
        llm_timeout_secs: cli.llm_timeout,
        llm_keep_alive: cli.llm_keep_alive,
        system_prompt: cli.system_prompt,
        tts_url: cli.tts_url,
        tts_voice: cli.tts_voice,
        tts_timeout_secs: cli.tts_timeout,
        disable_tts: cli.no_tts,
    }
}

/// Run the live pipeline until interrupted
#[allow(clippy::future_not_send)]
async fn run_assistant(config: Config) -> anyhow::Result<()> {
    // Startup failures here are fatal: microphone and recognizer are
    // required dependencies
    let transcriber = create_transcriber(&config.recognizer)?;
    let mut capture = AudioCapture::new(config.input_device.as_deref())?;
    let playback = AudioPlayback::new()?;

    let generator = OllamaGenerator::new(config.generator.clone())?;
    if let Err(e) = generator.health_check().await {
        tracing::warn!(error = %e, url = %config.generator.url, "generator not reachable yet");
    }
    // Load the model into server memory while we start listening
    let warm = generator.clone();
    tokio::spawn(async move { warm.warm_up().await });

    let synthesizer = MimicSynthesizer::new(config.synthesizer.clone())?;

    let events = event_channel();
    let event_rx = events.subscribe();

    capture.start()?;
    let recognition = spawn_recognition(transcriber, capture.queue(), events);

    // Ctrl-C → shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    tracing::info!(
        wake_phrase = %config.wake_phrase,
        silence_timeout = ?config.silence_timeout,
        tts = config.synthesizer.enabled,
        "rocket assistant ready"
    );

    let mut orchestrator =
        ConversationOrchestrator::new(&config, generator, synthesizer, playback)?;
    let result = orchestrator.run(event_rx, shutdown_rx).await;

    capture.stop();
    recognition.await.ok();

    tracing::info!(turns = orchestrator.completed_turns(), "assistant stopped");
    result.map_err(Into::into)
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(cli: &Cli, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new(cli.device.as_deref())?;
    let queue = capture.queue();
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut samples: Vec<i16> = Vec::new();
        while let Some(frame) = queue.pop(Duration::from_millis(1)) {
            samples.extend_from_slice(&frame.samples);
        }

        let energy = calculate_rms(&samples);
        let peak = samples
            .iter()
            .map(|s| f32::from(*s).abs() / 32768.0)
            .fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: rocket list-devices");

    Ok(())
}

/// Calculate normalized RMS energy of i16 samples
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let v = f32::from(s) / 32768.0;
            v * v
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 22050u32;
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

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback.play_samples(&DecodedAudio {
        samples,
        sample_rate,
    })?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS synthesis and playback
#[allow(clippy::future_not_send)]
async fn test_tts(cli: &Cli, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load(Overrides {
        tts_url: cli.tts_url.clone(),
        tts_voice: cli.tts_voice.clone(),
        tts_timeout_secs: cli.tts_timeout,
        ..Overrides::default()
    })?;

    let synthesizer = MimicSynthesizer::new(config.synthesizer.clone())?;

    println!("Synthesizing speech...");
    let audio = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio data", audio.len());

    println!("Playing audio...");
    let mut playback = AudioPlayback::new()?;
    playback.play(&audio)?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// List audio input devices
fn list_devices() -> anyhow::Result<()> {
    let devices = list_input_devices()?;

    if devices.is_empty() {
        println!("No audio input devices found");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  {name}");
        }
    }

    Ok(())
}
