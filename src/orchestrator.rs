//! Conversation orchestration
//!
//! The state machine gating utterance capture behind the wake phrase and
//! serializing turns: Idle → Armed → Capturing → Dispatching → Speaking →
//! Idle. The orchestrator owns the one live [`Session`], consumes transcript
//! events and timer fires one at a time, and is the only place blocking
//! external calls happen. Transcript events arriving mid-turn are discarded
//! when the turn ends — a wake phrase spoken while Rocket is thinking or
//! talking does not interrupt.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::audio::{PlaybackSink, WakeSounds};
use crate::config::Config;
use crate::llm::{Reply, ResponseGenerator};
use crate::recognizer::TranscriptEvent;
use crate::tts::SpeechSynthesizer;
use crate::wake::WakeWordDetector;
use crate::{Error, Result};

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Listening for the wake phrase in finalized transcripts
    Idle,
    /// Wake matched; transient hand-off into capture
    Armed,
    /// Accumulating the spoken command until silence or the hard cap
    Capturing,
    /// Waiting on the response generator
    Dispatching,
    /// Synthesizing and playing the reply
    Speaking,
}

/// One wake-to-reply cycle
///
/// Exactly one session is live between Armed and the return to Idle; the
/// orchestrator owns it exclusively.
struct Session {
    id: Uuid,
    /// Finalized, sanitized chunks joined in arrival order
    committed: String,
    /// Latest partial hypothesis; replaced on every newer partial
    pending_partial: String,
    /// Last committed chunk, for duplicate suppression
    last_chunk: String,
    /// Armed once the first non-empty command text is heard
    silence_deadline: Option<Instant>,
    /// Absolute cap on capture duration, armed at wake
    hard_deadline: Instant,
}

impl Session {
    /// Create a session at wake time, seeding any same-utterance remainder
    fn new(remainder: &str, now: Instant, silence_timeout: Duration, max_capture: Duration) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            committed: String::new(),
            pending_partial: String::new(),
            last_chunk: String::new(),
            silence_deadline: None,
            hard_deadline: now + max_capture,
        };

        if !remainder.is_empty() {
            session.committed = remainder.to_string();
            session.last_chunk = remainder.to_string();
            session.silence_deadline = Some(now + silence_timeout);
        }

        session
    }

    /// Record a finalized chunk (already sanitized)
    ///
    /// Non-empty speech restarts the silence timer whether or not the chunk
    /// is appended; duplicates of what was just heard are not appended.
    fn note_final(&mut self, chunk: &str, now: Instant, silence_timeout: Duration) {
        if chunk.is_empty() {
            return;
        }

        self.pending_partial.clear();
        self.silence_deadline = Some(now + silence_timeout);

        if chunk == self.last_chunk || self.committed.ends_with(chunk) {
            return;
        }

        if self.committed.is_empty() {
            self.committed = chunk.to_string();
        } else {
            self.committed.push(' ');
            self.committed.push_str(chunk);
        }
        self.last_chunk = chunk.to_string();
    }

    /// Record a partial hypothesis (already sanitized), replacing the last
    fn note_partial(&mut self, text: &str, now: Instant, silence_timeout: Duration) {
        if text.is_empty() {
            return;
        }

        self.pending_partial = text.to_string();
        self.silence_deadline = Some(now + silence_timeout);
    }

    /// The accumulated command text
    fn command_text(&self) -> String {
        if self.pending_partial.is_empty() {
            self.committed.clone()
        } else if self.committed.is_empty() {
            self.pending_partial.clone()
        } else {
            format!("{} {}", self.committed, self.pending_partial)
        }
    }

    /// The next deadline to wait on: silence timer if armed, else hard cap
    fn next_deadline(&self) -> Instant {
        match self.silence_deadline {
            Some(silence) => silence.min(self.hard_deadline),
            None => self.hard_deadline,
        }
    }
}

/// The turn-taking state machine
///
/// Generic over its external collaborators so the full state machine runs
/// under test with scripted doubles.
pub struct ConversationOrchestrator<G, S, P> {
    detector: WakeWordDetector,
    generator: G,
    synthesizer: S,
    sink: P,
    wake_sounds: Option<WakeSounds>,
    silence_timeout: Duration,
    max_capture: Duration,
    tts_enabled: bool,
    state: State,
    session: Option<Session>,
    completed_turns: u64,
}

impl<G, S, P> ConversationOrchestrator<G, S, P>
where
    G: ResponseGenerator,
    S: SpeechSynthesizer,
    P: PlaybackSink,
{
    /// Create an orchestrator from configuration and collaborators
    ///
    /// # Errors
    ///
    /// Returns error if the wake phrase is invalid
    pub fn new(config: &Config, generator: G, synthesizer: S, sink: P) -> Result<Self> {
        let detector = WakeWordDetector::new(&config.wake_phrase)?;
        let wake_sounds = config.wake_sound_dir.clone().map(WakeSounds::new);

        Ok(Self {
            detector,
            generator,
            synthesizer,
            sink,
            wake_sounds,
            silence_timeout: config.silence_timeout,
            max_capture: config.max_capture,
            tts_enabled: config.synthesizer.enabled,
            state: State::Idle,
            session: None,
            completed_turns: 0,
        })
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Turns completed since startup
    #[must_use]
    pub const fn completed_turns(&self) -> u64 {
        self.completed_turns
    }

    /// Run until shutdown or the recognition stream dies
    ///
    /// # Errors
    ///
    /// Returns error if the transcript channel closes unexpectedly — the
    /// recognizer is a required dependency and its loss is fatal for the
    /// process run.
    pub async fn run(
        &mut self,
        mut events: broadcast::Receiver<TranscriptEvent>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!(phrase = %self.detector.phrase(), "listening for wake phrase");

        loop {
            let deadline = self.session.as_ref().map(Session::next_deadline);
            let sleep_target = deadline.unwrap_or_else(far_future);

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("shutdown requested");
                    return Ok(());
                }
                event = events.recv() => match event {
                    Ok(event) => self.on_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "transcript events dropped, consumer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(Error::Recognizer(
                            "recognition stream ended unexpectedly".to_string(),
                        ));
                    }
                },
                () = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                    self.on_deadline();
                }
            }

            if self.state == State::Dispatching {
                self.run_turn().await;
                drain_backlog(&mut events);
            }
        }
    }

    /// Handle one transcript event according to the current state
    fn on_event(&mut self, event: &TranscriptEvent) {
        match self.state {
            State::Idle => {
                // Partial hypotheses are too unstable to trigger on
                if !event.is_final {
                    return;
                }

                let Some(wake) = self.detector.matches(&event.text) else {
                    tracing::trace!(text = %event.text, "no wake phrase, discarding");
                    return;
                };

                let now = Instant::now();
                let session = Session::new(
                    &wake.remainder,
                    now,
                    self.silence_timeout,
                    self.max_capture,
                );

                tracing::info!(
                    turn = %session.id,
                    seeded = %wake.remainder,
                    "wake phrase detected, capturing command"
                );

                if let Some(sounds) = &self.wake_sounds {
                    sounds.play_random_detached();
                }

                self.session = Some(session);
                self.state = State::Armed;
                // Armed is transient: capture starts with the next event
                self.state = State::Capturing;
            }
            State::Capturing => {
                let sanitized = self.detector.strip_phrase(&event.text);
                let now = Instant::now();

                let Some(session) = self.session.as_mut() else {
                    return;
                };

                if event.is_final {
                    session.note_final(&sanitized, now, self.silence_timeout);
                } else {
                    session.note_partial(&sanitized, now, self.silence_timeout);
                }

                tracing::debug!(
                    turn = %session.id,
                    command = %session.command_text(),
                    is_final = event.is_final,
                    "command text updated"
                );
            }
            // Mid-turn events never reach here: the turn runs inline and
            // its backlog is drained before the loop resumes
            State::Armed | State::Dispatching | State::Speaking => {}
        }
    }

    /// A capture deadline fired: silence timeout or the hard cap
    fn on_deadline(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let now = Instant::now();
        let silence_fired = session.silence_deadline.is_some_and(|d| now >= d);
        let hard_fired = now >= session.hard_deadline;

        if !silence_fired && !hard_fired {
            return;
        }

        tracing::debug!(
            turn = %session.id,
            hard_cap = hard_fired && !silence_fired,
            "utterance complete"
        );
        self.state = State::Dispatching;
    }

    /// Run one turn to completion: Dispatching, optionally Speaking, Idle
    async fn run_turn(&mut self) {
        let Some(session) = self.session.take() else {
            self.state = State::Idle;
            return;
        };

        let turn = session.id;
        let command = session.command_text();
        tracing::info!(%turn, command = %command, "dispatching command");

        match self.generator.generate(&command).await {
            Ok(reply) => {
                // The textual reply is delivered here regardless of what
                // happens to the spoken rendering
                tracing::info!(%turn, reply = %reply.text, "reply");

                if self.tts_enabled {
                    self.state = State::Speaking;
                    self.speak(turn, &reply).await;
                }
            }
            Err(e) => {
                tracing::warn!(%turn, error = %e, "generation failed, abandoning turn");
            }
        }

        self.state = State::Idle;
        self.completed_turns += 1;
        tracing::info!(phrase = %self.detector.phrase(), "listening for wake phrase");
    }

    /// Synthesize and play the reply; failures degrade to text-only
    async fn speak(&mut self, turn: Uuid, reply: &Reply) {
        match self.synthesizer.synthesize(&reply.text).await {
            Ok(audio) => {
                if let Err(e) = self.sink.play(&audio) {
                    tracing::warn!(%turn, error = %e, "playback failed, reply delivered as text only");
                }
            }
            Err(e) => {
                tracing::warn!(%turn, error = %e, "synthesis failed, reply delivered as text only");
            }
        }
    }
}

/// Discard transcript events that arrived while a turn was running
fn drain_backlog(events: &mut broadcast::Receiver<TranscriptEvent>) {
    let mut skipped = 0u64;
    loop {
        match events.try_recv() {
            Ok(_) => skipped += 1,
            Err(broadcast::error::TryRecvError::Lagged(n)) => skipped += n,
            // Closed surfaces as a fatal error on the next recv
            Err(_) => break,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "discarded transcript events from mid-turn");
    }
}

/// A deadline far enough away to never fire; used to keep the timer branch
/// inert while no session is live
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400)
}
