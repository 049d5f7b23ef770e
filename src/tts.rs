//! Speech synthesis
//!
//! Narrow request/response boundary to a Mimic3-compatible TTS endpoint.
//! The response body is a WAV container with its sample rate embedded;
//! decoding happens at the playback sink. Failures are classified the same
//! way as the generator's and degrade to text-only delivery.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SynthesizerConfig;
use crate::{Error, Result};

/// Connect timeout for synthesizer requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Text-to-audio boundary driven by the orchestrator
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` as decodable audio bytes
    ///
    /// # Errors
    ///
    /// Returns error on connection failure, timeout, or a malformed
    /// response; all are recoverable — the reply text was already
    /// delivered.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Synthesizes speech via a Mimic3-compatible HTTP endpoint
#[derive(Clone)]
pub struct MimicSynthesizer {
    client: reqwest::Client,
    config: SynthesizerConfig,
}

impl MimicSynthesizer {
    /// Create a synthesizer client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: SynthesizerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client, config })
    }

    /// The configured voice identifier
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.config.voice
    }
}

#[async_trait]
impl SpeechSynthesizer for MimicSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/tts", self.config.url.trim_end_matches('/'));

        tracing::debug!(voice = %self.config.voice, chars = text.len(), "synthesize request");

        let response = self
            .client
            .get(&url)
            .query(&[("text", text), ("voice", self.config.voice.as_str())])
            .send()
            .await
            .map_err(|e| Error::Synthesize(format!("{}: {e}", Error::classify_http(&e))))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesize(format!(
                "synthesizer error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesize(format!("malformed-response: {e}")))?;

        if audio.is_empty() {
            return Err(Error::Synthesize("synthesizer returned no audio".to_string()));
        }

        tracing::debug!(bytes = audio.len(), "synthesized audio received");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_with_configured_timeout() {
        let synth = MimicSynthesizer::new(SynthesizerConfig {
            enabled: true,
            url: "http://localhost:59125".to_string(),
            voice: "en_UK/apope_low".to_string(),
            timeout: Duration::from_secs(10),
        })
        .unwrap();

        assert_eq!(synth.voice(), "en_UK/apope_low");
    }
}
