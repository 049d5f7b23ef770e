//! Vosk-backed streaming transcription
//!
//! Local offline recognition. Requires libvosk at link time and a model
//! directory on disk (e.g. vosk-model-small-en-us-0.15).

use std::path::Path;

use vosk::{DecodingState, Model, Recognizer};

use super::{Transcriber, TranscriptEvent};
use crate::audio::SAMPLE_RATE;
use crate::{Error, Result};

/// Streaming transcriber over a local Vosk model
pub struct VoskTranscriber {
    recognizer: Recognizer,
    last_partial: String,
}

impl VoskTranscriber {
    /// Load the model at `model_path` and create a 16 kHz recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the model directory cannot be loaded or the
    /// recognizer cannot be created.
    pub fn new(model_path: &Path) -> Result<Self> {
        let model = Model::new(model_path.display().to_string()).ok_or_else(|| {
            Error::Recognizer(format!(
                "failed to load recognizer model at {}",
                model_path.display()
            ))
        })?;

        #[allow(clippy::cast_precision_loss)]
        let recognizer = Recognizer::new(&model, SAMPLE_RATE as f32)
            .ok_or_else(|| Error::Recognizer("failed to create recognizer".to_string()))?;

        tracing::debug!(model = %model_path.display(), "recognizer initialized");

        Ok(Self {
            recognizer,
            last_partial: String::new(),
        })
    }
}

impl Transcriber for VoskTranscriber {
    fn accept_frame(&mut self, samples: &[i16]) -> Result<Option<TranscriptEvent>> {
        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| Error::Recognizer(format!("accept_waveform: {e}")))?;

        match state {
            DecodingState::Finalized => {
                self.last_partial.clear();
                let text = self
                    .recognizer
                    .result()
                    .single()
                    .map(|r| r.text.trim().to_string())
                    .unwrap_or_default();

                // Silence windows finalize as empty segments constantly;
                // only actual speech is an event
                if text.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(TranscriptEvent::finalized(text)))
                }
            }
            DecodingState::Running => {
                let partial = self.recognizer.partial_result().partial.trim().to_string();

                // The engine re-emits an unchanged partial on every silence
                // frame; suppress those so downstream timers only see news
                if partial.is_empty() || partial == self.last_partial {
                    Ok(None)
                } else {
                    self.last_partial = partial.clone();
                    Ok(Some(TranscriptEvent::partial(partial)))
                }
            }
            DecodingState::Failed => Err(Error::Recognizer("decoding failed".to_string())),
        }
    }

    fn reset(&mut self) {
        self.last_partial.clear();
        self.recognizer.reset();
    }
}
