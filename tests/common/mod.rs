//! Shared test doubles for pipeline tests
//!
//! Scripted collaborators record their calls into one shared log so tests
//! can assert cross-component ordering (e.g. playback finished before the
//! next turn dispatched).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rocket_assistant::audio::PlaybackSink;
use rocket_assistant::config::{
    Config, GeneratorConfig, RecognizerConfig, SynthesizerConfig,
};
use rocket_assistant::llm::{Reply, ResponseGenerator};
use rocket_assistant::tts::SpeechSynthesizer;
use rocket_assistant::{Error, Result};

/// Shared, ordered record of collaborator calls
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

/// Generator double: scripted reply or scripted failure, optional latency
pub struct MockGenerator {
    pub log: CallLog,
    pub reply: String,
    pub fail: bool,
    pub delay: Duration,
}

impl MockGenerator {
    pub fn replying(log: CallLog, reply: &str) -> Self {
        Self {
            log,
            reply: reply.to_string(),
            fail: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            log,
            reply: String::new(),
            fail: true,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ResponseGenerator for MockGenerator {
    async fn generate(&self, command: &str) -> Result<Reply> {
        self.log.push(format!("generate:{command}"));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail {
            Err(Error::Generate(
                "connection-refused: generator unreachable".to_string(),
            ))
        } else {
            Ok(Reply {
                text: self.reply.clone(),
            })
        }
    }
}

/// Synthesizer double: fixed audio bytes or scripted failure
pub struct MockSynthesizer {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.log.push(format!("synthesize:{text}"));

        if self.fail {
            Err(Error::Synthesize(
                "connection-refused: synthesizer unreachable".to_string(),
            ))
        } else {
            Ok(b"RIFFfake-wav-bytes".to_vec())
        }
    }
}

/// Playback double: records the byte count it was handed
pub struct MockSink {
    pub log: CallLog,
    pub fail: bool,
}

impl PlaybackSink for MockSink {
    fn play(&mut self, audio: &[u8]) -> Result<()> {
        self.log.push(format!("play:{}", audio.len()));

        if self.fail {
            Err(Error::Audio("no output device".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Config tuned for fast tests: short silence timeout and hard cap
pub fn test_config(silence: Duration, cap: Duration, tts_enabled: bool) -> Config {
    Config {
        wake_phrase: "hey rocket".to_string(),
        silence_timeout: silence,
        max_capture: cap,
        wake_sound_dir: None,
        input_device: None,
        recognizer: RecognizerConfig::default(),
        generator: GeneratorConfig {
            url: "http://localhost:11434".to_string(),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(1),
            keep_alive: "1m".to_string(),
            system_prompt: "test prompt".to_string(),
        },
        synthesizer: SynthesizerConfig {
            enabled: tts_enabled,
            url: "http://localhost:59125".to_string(),
            voice: "test-voice".to_string(),
            timeout: Duration::from_secs(1),
        },
    }
}
