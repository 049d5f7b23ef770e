//! Full pipeline tests without hardware
//!
//! Frames flow through the real capture queue into the recognition task
//! (with a scripted engine) and on to the orchestrator with mock external
//! collaborators — the same task topology as the live assistant.

mod common;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use common::{CallLog, MockGenerator, MockSink, MockSynthesizer, test_config};
use rocket_assistant::audio::{AudioFrame, FrameQueue};
use rocket_assistant::orchestrator::{ConversationOrchestrator, State};
use rocket_assistant::recognizer::{
    Transcriber, TranscriptEvent, event_channel, spawn_recognition,
};
use rocket_assistant::Result;

/// Engine double emitting one scripted event per consumed frame
struct ScriptedEngine {
    script: VecDeque<Option<TranscriptEvent>>,
}

impl ScriptedEngine {
    fn new(script: Vec<Option<TranscriptEvent>>) -> Box<Self> {
        Box::new(Self {
            script: script.into(),
        })
    }
}

impl Transcriber for ScriptedEngine {
    fn accept_frame(&mut self, _samples: &[i16]) -> Result<Option<TranscriptEvent>> {
        Ok(self.script.pop_front().flatten())
    }

    fn reset(&mut self) {
        self.script.clear();
    }
}

fn frame(seq: u64) -> AudioFrame {
    AudioFrame {
        seq,
        samples: vec![0i16; 1600],
    }
}

#[tokio::test]
async fn frames_to_spoken_reply() {
    let log = CallLog::default();

    let engine = ScriptedEngine::new(vec![
        None,
        Some(TranscriptEvent::finalized("hey rocket")),
        Some(TranscriptEvent::partial("what is the")),
        Some(TranscriptEvent::finalized("what is the capital of france")),
        None,
    ]);

    let frames = Arc::new(FrameQueue::new());
    let events = event_channel();
    let event_rx = events.subscribe();

    let recognition = spawn_recognition(engine, Arc::clone(&frames), events);

    let mut orchestrator = ConversationOrchestrator::new(
        &test_config(Duration::from_millis(100), Duration::from_secs(5), true),
        MockGenerator::replying(log.clone(), "The capital of France is Paris."),
        MockSynthesizer {
            log: log.clone(),
            fail: false,
        },
        MockSink {
            log: log.clone(),
            fail: false,
        },
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let driver = tokio::spawn(async move {
        let result = orchestrator.run(event_rx, shutdown_rx).await;
        (orchestrator, result)
    });

    // Microphone side: frames arrive in order
    for seq in 0..5 {
        frames.push(frame(seq));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Silence: no further events, the timeout completes the utterance
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(
        log.entries(),
        vec![
            "generate:what is the capital of france",
            "synthesize:The capital of France is Paris.",
            "play:18",
        ]
    );

    let _ = shutdown_tx.send(()).await;
    let (orchestrator, result) = driver.await.unwrap();
    assert!(result.is_ok());
    assert_eq!(orchestrator.state(), State::Idle);
    assert_eq!(orchestrator.completed_turns(), 1);

    frames.close();
    recognition.await.unwrap();
}

#[tokio::test]
async fn engine_failure_terminates_the_run_with_a_diagnostic() {
    struct DyingEngine;

    impl Transcriber for DyingEngine {
        fn accept_frame(&mut self, _samples: &[i16]) -> Result<Option<TranscriptEvent>> {
            Err(rocket_assistant::Error::Recognizer(
                "engine crashed".to_string(),
            ))
        }

        fn reset(&mut self) {}
    }

    let log = CallLog::default();
    let frames = Arc::new(FrameQueue::new());
    let events = event_channel();
    let event_rx = events.subscribe();

    let recognition = spawn_recognition(Box::new(DyingEngine), Arc::clone(&frames), events);

    let mut orchestrator = ConversationOrchestrator::new(
        &test_config(Duration::from_millis(100), Duration::from_secs(5), true),
        MockGenerator::replying(log.clone(), "ok"),
        MockSynthesizer {
            log: log.clone(),
            fail: false,
        },
        MockSink {
            log: log.clone(),
            fail: false,
        },
    )
    .unwrap();

    let (_shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    frames.push(frame(0));

    // The engine fails on the first frame; the recognition task exits and
    // the orchestrator must surface a fatal recognizer error
    let result = orchestrator.run(event_rx, shutdown_rx).await;
    assert!(matches!(
        result,
        Err(rocket_assistant::Error::Recognizer(_))
    ));
    assert!(log.entries().is_empty());

    recognition.await.unwrap();
}
