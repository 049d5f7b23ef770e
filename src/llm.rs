//! Response generation
//!
//! Narrow request/response boundary to an Ollama-compatible completion
//! endpoint. Every call carries a bounded timeout; failures are classified
//! (connection-refused / timeout / malformed-response) and surface as
//! recoverable errors the orchestrator degrades on.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorConfig;
use crate::{Error, Result};

/// Connect timeout for generator requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the startup health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Sampling temperature for spoken replies
const TEMPERATURE: f32 = 0.2;

/// Reply text from the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
}

/// Text completion boundary driven by the orchestrator
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply for `command` under the configured system prompt
    ///
    /// # Errors
    ///
    /// Returns error on connection failure, timeout, or a malformed
    /// response; all are recoverable at the turn boundary.
    async fn generate(&self, command: &str) -> Result<Reply>;
}

/// Ollama `/api/generate` request body
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    keep_alive: &'a str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama `/api/generate` response body
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Generates replies via an Ollama-compatible HTTP endpoint
#[derive(Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl OllamaGenerator {
    /// Create a generator client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { client, config })
    }

    /// Probe the endpoint at startup
    ///
    /// A failed probe is a warning, not a startup abort — the server may
    /// come up later.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint does not answer the model listing
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.config.url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Generate(format!("{}: {e}", Error::classify_http(&e))))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Generate(format!(
                "generator health check returned {}",
                response.status()
            )))
        }
    }

    /// Best-effort model warm-up to cut first-turn latency
    ///
    /// Sends a single-token generation so the server loads the model into
    /// memory. Failures are logged and ignored.
    pub async fn warm_up(&self) {
        tracing::debug!(model = %self.config.model, "warming up generator");

        let result = self
            .request(
                "ok",
                GenerateOptions {
                    temperature: 0.0,
                    num_predict: Some(1),
                },
            )
            .await;

        match result {
            Ok(_) => tracing::debug!("generator warm-up complete"),
            Err(e) => tracing::debug!(error = %e, "generator warm-up failed"),
        }
    }

    async fn request(&self, prompt: &str, options: GenerateOptions) -> Result<Reply> {
        let url = format!("{}/api/generate", self.config.url.trim_end_matches('/'));

        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            system: &self.config.system_prompt,
            stream: false,
            keep_alive: &self.config.keep_alive,
            options,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generate(format!("{}: {e}", Error::classify_http(&e))))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generate(format!("generator error {status}: {body}")));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Generate(format!("malformed-response: {e}")))?;

        Ok(Reply {
            text: result.response.trim().to_string(),
        })
    }
}

#[async_trait]
impl ResponseGenerator for OllamaGenerator {
    async fn generate(&self, command: &str) -> Result<Reply> {
        tracing::debug!(model = %self.config.model, chars = command.len(), "generate request");

        let reply = self
            .request(
                command,
                GenerateOptions {
                    temperature: TEMPERATURE,
                    num_predict: None,
                },
            )
            .await?;

        tracing::info!(chars = reply.text.len(), "reply generated");
        Ok(reply)
    }
}
