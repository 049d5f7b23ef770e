//! TOML configuration file loading
//!
//! Supports `~/.config/rocket/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RocketConfigFile {
    /// Wake word and capture timing
    #[serde(default)]
    pub wake: WakeFileConfig,

    /// Language-model endpoint configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech-synthesis endpoint configuration
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Audio device configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Speech-recognition configuration
    #[serde(default)]
    pub recognizer: RecognizerFileConfig,
}

/// Wake word and capture timing
#[derive(Debug, Default, Deserialize)]
pub struct WakeFileConfig {
    /// Wake phrase (e.g. "hey rocket")
    pub phrase: Option<String>,

    /// Silence timeout in seconds before a captured command is complete
    pub silence_timeout_secs: Option<f64>,

    /// Hard cap on capture duration in seconds
    pub max_capture_secs: Option<f64>,

    /// Directory of wake acknowledgment sounds (.wav/.mp3)
    pub sound_dir: Option<String>,
}

/// Language-model endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Generator base URL (e.g. `http://localhost:11434`)
    pub url: Option<String>,

    /// Model identifier (e.g. "qwen3:1.7b")
    pub model: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// How long the server should keep the model loaded (e.g. "10m")
    pub keep_alive: Option<String>,

    /// System prompt override
    pub system_prompt: Option<String>,
}

/// Speech-synthesis endpoint configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// Enable spoken replies
    pub enabled: Option<bool>,

    /// Synthesizer base URL (e.g. `http://localhost:59125`)
    pub url: Option<String>,

    /// Voice identifier (e.g. "en_UK/apope_low")
    pub voice: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Audio device configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Input device name; omit for the host default
    pub input_device: Option<String>,
}

/// Speech-recognition configuration
#[derive(Debug, Default, Deserialize)]
pub struct RecognizerFileConfig {
    /// Path to the recognizer model directory
    pub model_path: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `RocketConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file() -> RocketConfigFile {
    let Some(path) = config_file_path() else {
        return RocketConfigFile::default();
    };

    if !path.exists() {
        return RocketConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RocketConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RocketConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/rocket/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("rocket").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let file: RocketConfigFile = toml::from_str(
            r#"
            [wake]
            phrase = "hey rocket"
            silence_timeout_secs = 2.5

            [llm]
            model = "qwen3:1.7b"
            "#,
        )
        .unwrap();

        assert_eq!(file.wake.phrase.as_deref(), Some("hey rocket"));
        assert_eq!(file.wake.silence_timeout_secs, Some(2.5));
        assert_eq!(file.llm.model.as_deref(), Some("qwen3:1.7b"));
        // Untouched sections fall back to empty overlays
        assert!(file.tts.url.is_none());
        assert!(file.audio.input_device.is_none());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file: RocketConfigFile = toml::from_str("").unwrap();
        assert!(file.wake.phrase.is_none());
        assert!(file.llm.url.is_none());
        assert!(file.recognizer.model_path.is_none());
    }
}
