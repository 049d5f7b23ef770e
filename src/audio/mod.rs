//! Audio input/output
//!
//! Microphone capture into a bounded frame queue, synchronous playback of
//! decoded WAV/MP3 audio, and wake acknowledgment sounds.

mod capture;
mod chime;
mod playback;

pub use capture::{AudioCapture, AudioFrame, FrameQueue, SAMPLE_RATE, list_input_devices};
pub use chime::WakeSounds;
pub use playback::{AudioPlayback, DecodedAudio, PlaybackSink, decode_mp3, decode_wav};
