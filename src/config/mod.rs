//! Configuration for the Rocket assistant
//!
//! Layering, highest precedence first: CLI flags (with their env-var
//! fallbacks) > `~/.config/rocket/config.toml` > built-in defaults. The
//! resolved [`Config`] is immutable for the process lifetime.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default wake phrase
pub const DEFAULT_WAKE_PHRASE: &str = "hey rocket";

/// Default silence timeout before a captured command is considered complete
const DEFAULT_SILENCE_TIMEOUT_SECS: f64 = 3.0;

/// Default hard cap on capture duration
const DEFAULT_MAX_CAPTURE_SECS: f64 = 20.0;

/// Default generator endpoint (Ollama)
const DEFAULT_LLM_URL: &str = "http://localhost:11434";

/// Default generator model
const DEFAULT_LLM_MODEL: &str = "qwen3:1.7b";

/// Default generator request timeout
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Default model keep-alive hint passed to the generator
const DEFAULT_LLM_KEEP_ALIVE: &str = "10m";

/// Default synthesizer endpoint (Mimic3)
const DEFAULT_TTS_URL: &str = "http://localhost:59125";

/// Default synthesizer voice
const DEFAULT_TTS_VOICE: &str = "en_UK/apope_low";

/// Default synthesizer request timeout
const DEFAULT_TTS_TIMEOUT_SECS: u64 = 10;

/// Default system prompt for spoken replies
const DEFAULT_SYSTEM_PROMPT: &str = "You are Rocket, a helpful voice assistant. \
    Keep your responses SHORT and CONCISE - use only 3-4 sentences maximum. \
    Be direct and to the point. Avoid lengthy explanations unless specifically asked.";

/// Resolved assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Wake phrase, matched case-insensitively against finalized transcripts
    pub wake_phrase: String,

    /// Silence duration after the last speech before the command is complete
    pub silence_timeout: Duration,

    /// Hard cap on capture duration, silence or not
    pub max_capture: Duration,

    /// Directory of wake acknowledgment sounds; `None` disables them
    pub wake_sound_dir: Option<PathBuf>,

    /// Microphone device name; `None` uses the host default
    pub input_device: Option<String>,

    /// Speech-recognition settings
    pub recognizer: RecognizerConfig,

    /// Response-generator settings
    pub generator: GeneratorConfig,

    /// Speech-synthesizer settings
    pub synthesizer: SynthesizerConfig,
}

/// Speech-recognition settings
#[derive(Debug, Clone, Default)]
pub struct RecognizerConfig {
    /// Path to the recognizer model directory; `None` lets the backend
    /// use its own default lookup
    pub model_path: Option<PathBuf>,
}

/// Response-generator settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base URL of the generator HTTP endpoint
    pub url: String,

    /// Model identifier
    pub model: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Keep-alive hint (how long the server keeps the model loaded)
    pub keep_alive: String,

    /// System prompt sent with every command
    pub system_prompt: String,
}

/// Speech-synthesizer settings
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Whether spoken replies are produced at all
    pub enabled: bool,

    /// Base URL of the synthesizer HTTP endpoint
    pub url: String,

    /// Voice identifier
    pub voice: String,

    /// Per-request timeout
    pub timeout: Duration,
}

/// CLI-level overrides applied on top of the config file
///
/// `None` means "not given on the command line"; clap's env-var fallbacks
/// are already folded in by the time this struct is built.
#[derive(Debug, Default)]
pub struct Overrides {
    pub wake_phrase: Option<String>,
    pub silence_timeout_secs: Option<f64>,
    pub max_capture_secs: Option<f64>,
    pub wake_sound_dir: Option<PathBuf>,
    pub input_device: Option<String>,
    pub model_path: Option<PathBuf>,
    pub llm_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub llm_keep_alive: Option<String>,
    pub system_prompt: Option<String>,
    pub tts_url: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_timeout_secs: Option<u64>,
    /// Set by `--no-tts`; wins over file and default
    pub disable_tts: bool,
}

impl Config {
    /// Resolve configuration from CLI overrides, the config file, and defaults
    ///
    /// # Errors
    ///
    /// Returns error if the resolved values are invalid (empty wake phrase,
    /// non-positive timeouts).
    pub fn load(overrides: Overrides) -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(overrides, fc)
    }

    /// Merge overrides onto a file overlay onto defaults
    fn resolve(ov: Overrides, fc: file::RocketConfigFile) -> Result<Self> {
        let wake_phrase = ov
            .wake_phrase
            .or(fc.wake.phrase)
            .unwrap_or_else(|| DEFAULT_WAKE_PHRASE.to_string())
            .trim()
            .to_lowercase();

        let silence_timeout_secs = ov
            .silence_timeout_secs
            .or(fc.wake.silence_timeout_secs)
            .unwrap_or(DEFAULT_SILENCE_TIMEOUT_SECS);

        let max_capture_secs = ov
            .max_capture_secs
            .or(fc.wake.max_capture_secs)
            .unwrap_or(DEFAULT_MAX_CAPTURE_SECS);

        if wake_phrase.is_empty() {
            return Err(Error::Config("wake phrase must not be empty".to_string()));
        }
        if !silence_timeout_secs.is_finite() || silence_timeout_secs <= 0.0 {
            return Err(Error::Config(format!(
                "silence timeout must be positive, got {silence_timeout_secs}"
            )));
        }
        if !max_capture_secs.is_finite() || max_capture_secs <= 0.0 {
            return Err(Error::Config(format!(
                "max capture duration must be positive, got {max_capture_secs}"
            )));
        }

        let wake_sound_dir = ov
            .wake_sound_dir
            .or_else(|| fc.wake.sound_dir.map(PathBuf::from));

        let input_device = ov.input_device.or(fc.audio.input_device);

        let recognizer = RecognizerConfig {
            model_path: ov
                .model_path
                .or_else(|| fc.recognizer.model_path.map(PathBuf::from)),
        };

        let generator = GeneratorConfig {
            url: ov
                .llm_url
                .or(fc.llm.url)
                .unwrap_or_else(|| DEFAULT_LLM_URL.to_string()),
            model: ov
                .llm_model
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_secs(
                ov.llm_timeout_secs
                    .or(fc.llm.timeout_secs)
                    .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            ),
            keep_alive: ov
                .llm_keep_alive
                .or(fc.llm.keep_alive)
                .unwrap_or_else(|| DEFAULT_LLM_KEEP_ALIVE.to_string()),
            system_prompt: ov
                .system_prompt
                .or(fc.llm.system_prompt)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        let enabled = if ov.disable_tts {
            false
        } else {
            fc.tts.enabled.unwrap_or(true)
        };

        let synthesizer = SynthesizerConfig {
            enabled,
            url: ov
                .tts_url
                .or(fc.tts.url)
                .unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
            voice: ov
                .tts_voice
                .or(fc.tts.voice)
                .unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            timeout: Duration::from_secs(
                ov.tts_timeout_secs
                    .or(fc.tts.timeout_secs)
                    .unwrap_or(DEFAULT_TTS_TIMEOUT_SECS),
            ),
        };

        Ok(Self {
            wake_phrase,
            silence_timeout: Duration::from_secs_f64(silence_timeout_secs),
            max_capture: Duration::from_secs_f64(max_capture_secs),
            wake_sound_dir,
            input_device,
            recognizer,
            generator,
            synthesizer,
        })
    }
}
