//! Rocket Assistant - wake-word voice front-end for the Rocket robot
//!
//! This library provides the conversational pipeline:
//! - Microphone capture into a bounded, drop-oldest frame queue
//! - Streaming speech recognition behind the `Transcriber` trait
//! - Wake phrase detection over finalized transcripts
//! - Turn-taking orchestration (silence-timeout utterance capture,
//!   LLM dispatch, spoken replies)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   frames   ┌──────────────┐   events   ┌──────────────┐
//! │ AudioCapture ├───────────►│  Recognizer  ├───────────►│ Orchestrator │
//! └──────────────┘ drop-oldest└──────────────┘ drop-oldest└──────┬───────┘
//!                                                                │ one turn
//!                                             ┌──────────────────▼────────┐
//!                                             │ Generator → Synthesizer → │
//!                                             │       PlaybackSink        │
//!                                             └───────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod recognizer;
pub mod tts;
pub mod wake;

pub use config::Config;
pub use error::{Error, Result};
pub use llm::{OllamaGenerator, Reply, ResponseGenerator};
pub use orchestrator::{ConversationOrchestrator, State};
pub use recognizer::{Transcriber, TranscriptEvent};
pub use tts::{MimicSynthesizer, SpeechSynthesizer};
pub use wake::{WakeMatch, WakeWordDetector};
