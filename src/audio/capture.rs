//! Audio capture from microphone
//!
//! The capture callback converts hardware samples to 16 kHz mono i16 frames
//! and pushes them into a bounded queue. On overflow the oldest frame is
//! dropped so the microphone never stalls on a slow consumer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Bounded frame queue capacity (~6 s of audio at 100 ms frames)
const QUEUE_CAPACITY: usize = 64;

/// One chunk of captured PCM audio
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Monotonically increasing frame number within one capture session
    pub seq: u64,
    /// 16 kHz mono signed 16-bit samples
    pub samples: Vec<i16>,
}

/// Bounded drop-oldest queue between the capture callback and the recognizer
///
/// `push` never blocks: at capacity the oldest frame is discarded. `pop`
/// blocks with a timeout so the consumer can notice shutdown.
pub struct FrameQueue {
    inner: Mutex<QueueState>,
    ready: Condvar,
    dropped: AtomicU64,
}

struct QueueState {
    frames: VecDeque<AudioFrame>,
    closed: bool,
}

impl FrameQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueState {
                frames: VecDeque::with_capacity(QUEUE_CAPACITY),
                closed: false,
            }),
            ready: Condvar::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push a frame, discarding the oldest one if the queue is full
    pub fn push(&self, frame: AudioFrame) {
        let Ok(mut state) = self.inner.lock() else {
            return;
        };

        if state.frames.len() >= QUEUE_CAPACITY {
            state.frames.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped.is_multiple_of(64) {
                tracing::warn!(dropped, "capture queue full, dropping oldest frames");
            }
        }

        state.frames.push_back(frame);
        self.ready.notify_one();
    }

    /// Pop the oldest frame, waiting up to `timeout`
    ///
    /// Returns `None` on timeout or once the queue is closed and drained.
    pub fn pop(&self, timeout: Duration) -> Option<AudioFrame> {
        let mut state = self.inner.lock().ok()?;

        loop {
            if let Some(frame) = state.frames.pop_front() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }

            let (next, result) = self.ready.wait_timeout(state, timeout).ok()?;
            state = next;
            if result.timed_out() && state.frames.is_empty() {
                return None;
            }
        }
    }

    /// Close the queue, waking any blocked consumer
    pub fn close(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.closed = true;
        }
        self.ready.notify_all();
    }

    /// Whether the queue has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Total frames discarded due to overflow
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Captures audio from an input device into a [`FrameQueue`]
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    queue: Arc<FrameQueue>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// `device_name` selects a specific input device; `None` uses the host
    /// default.
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened or supports no 16 kHz
    /// mono configuration. This is fatal at startup.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = find_input_device(device_name)?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            queue: Arc::new(FrameQueue::new()),
            stream: None,
        })
    }

    /// The queue this capture pushes frames into
    #[must_use]
    pub fn queue(&self) -> Arc<FrameQueue> {
        Arc::clone(&self.queue)
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let queue = Arc::clone(&self.queue);
        let mut seq = 0u64;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let samples: Vec<i16> = data
                        .iter()
                        .map(|&s| {
                            #[allow(clippy::cast_possible_truncation)]
                            let v = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            v
                        })
                        .collect();
                    queue.push(AudioFrame { seq, samples });
                    seq += 1;
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing and close the frame queue
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!(
                dropped = self.queue.dropped_frames(),
                "audio capture stopped"
            );
        }
        self.queue.close();
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Resolve an input device by name, falling back to the host default
fn find_input_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    match name {
        Some(wanted) => host
            .input_devices()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == wanted))
            .ok_or_else(|| Error::Audio(format!("input device not found: {wanted}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string())),
    }
}

/// List available input device names for diagnostics
///
/// # Errors
///
/// Returns error if the host cannot enumerate devices
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::Audio(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: u64) -> AudioFrame {
        AudioFrame {
            seq,
            samples: vec![0i16; 160],
        }
    }

    #[test]
    fn queue_preserves_order() {
        let queue = FrameQueue::new();
        queue.push(frame(0));
        queue.push(frame(1));
        queue.push(frame(2));

        assert_eq!(queue.pop(Duration::from_millis(10)).unwrap().seq, 0);
        assert_eq!(queue.pop(Duration::from_millis(10)).unwrap().seq, 1);
        assert_eq!(queue.pop(Duration::from_millis(10)).unwrap().seq, 2);
    }

    #[test]
    fn queue_drops_oldest_at_capacity() {
        let queue = FrameQueue::new();
        for i in 0..(QUEUE_CAPACITY as u64 + 3) {
            queue.push(frame(i));
        }

        // The three oldest frames were discarded
        assert_eq!(queue.dropped_frames(), 3);
        assert_eq!(queue.pop(Duration::from_millis(10)).unwrap().seq, 3);
    }

    #[test]
    fn pop_times_out_when_empty() {
        let queue = FrameQueue::new();
        assert!(queue.pop(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn closed_queue_drains_then_ends() {
        let queue = FrameQueue::new();
        queue.push(frame(7));
        queue.close();

        assert_eq!(queue.pop(Duration::from_millis(10)).unwrap().seq, 7);
        assert!(queue.pop(Duration::from_millis(10)).is_none());
        assert!(queue.is_closed());
    }
}
