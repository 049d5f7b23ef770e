//! Streaming speech recognition
//!
//! The engine sits behind the [`Transcriber`] trait: feed it PCM frames,
//! get back partial/final transcript events. The recognition task runs on a
//! blocking thread, draining the capture queue and publishing events onto a
//! bounded broadcast channel — a lagging consumer loses the oldest events,
//! keeping the stream aligned with real time.

#[cfg(feature = "vosk")]
mod vosk;

#[cfg(feature = "vosk")]
pub use vosk::VoskTranscriber;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::audio::FrameQueue;
use crate::config::RecognizerConfig;
use crate::{Error, Result};

/// Bounded capacity of the transcript event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long the recognition thread waits for a frame before re-checking
/// for shutdown
const FRAME_POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// One hypothesis from the recognition engine
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Recognized text; partial hypotheses may be superseded by later ones
    pub text: String,
    /// Whether this is a finalized segment (stable, will not change)
    pub is_final: bool,
    /// When the engine produced this event
    pub timestamp: Instant,
}

impl TranscriptEvent {
    /// A partial (unstable) hypothesis
    #[must_use]
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            timestamp: Instant::now(),
        }
    }

    /// A finalized segment
    #[must_use]
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            timestamp: Instant::now(),
        }
    }
}

/// Streaming transcription engine boundary
///
/// Implementations are stateful across frames within one utterance. An
/// unchanged partial hypothesis must not be re-emitted — downstream
/// silence detection relies on events meaning "something new was heard".
pub trait Transcriber: Send {
    /// Feed 16 kHz mono i16 PCM samples
    ///
    /// Returns an event when the hypothesis advanced or a segment
    /// finalized, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the engine failed; the recognition task treats this
    /// as fatal for the process run.
    fn accept_frame(&mut self, samples: &[i16]) -> Result<Option<TranscriptEvent>>;

    /// Reset decoding state, discarding any in-flight hypothesis
    fn reset(&mut self);
}

/// Create the configured transcription engine
///
/// # Errors
///
/// Returns error if no backend is compiled in or the model cannot be loaded.
/// This is fatal at startup — recognition is a required dependency.
#[cfg_attr(not(feature = "vosk"), allow(unused_variables))]
pub fn create_transcriber(config: &RecognizerConfig) -> Result<Box<dyn Transcriber>> {
    #[cfg(feature = "vosk")]
    {
        let model_path = config.model_path.as_deref().ok_or_else(|| {
            Error::Recognizer("recognizer model path required (--model-path)".to_string())
        })?;
        return Ok(Box::new(VoskTranscriber::new(model_path)?));
    }

    #[cfg(not(feature = "vosk"))]
    {
        Err(Error::Recognizer(
            "this build has no recognition backend; rebuild with --features vosk".to_string(),
        ))
    }
}

/// Create the transcript event channel
///
/// Subscribe before spawning the recognition task; late subscribers only
/// see events sent after they subscribed.
#[must_use]
pub fn event_channel() -> broadcast::Sender<TranscriptEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Spawn the recognition task
///
/// Drains `frames`, feeds the engine, and publishes events on `events`.
/// Engine failure is fatal for the run: the task logs a diagnostic and
/// exits, dropping its sender so consumers observe a closed channel.
pub fn spawn_recognition(
    mut transcriber: Box<dyn Transcriber>,
    frames: Arc<FrameQueue>,
    events: broadcast::Sender<TranscriptEvent>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        tracing::debug!("recognition task started");

        loop {
            let Some(frame) = frames.pop(FRAME_POLL_TIMEOUT) else {
                if frames.is_closed() {
                    tracing::debug!("capture queue closed, recognition task exiting");
                    break;
                }
                continue;
            };

            match transcriber.accept_frame(&frame.samples) {
                Ok(Some(event)) => {
                    tracing::trace!(
                        text = %event.text,
                        is_final = event.is_final,
                        frame = frame.seq,
                        "transcript event"
                    );
                    // Send fails only when no receiver is alive; the
                    // orchestrator owns the lone receiver and exits with us
                    let _ = events.send(event);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "recognition engine failed, exiting");
                    break;
                }
            }
        }

        drop(events);
    })
}
