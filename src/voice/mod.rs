//! Voice processing module
//!
//! Handles microphone capture, real-time PCM encoding, the bounded
//! capture-to-network handoff, and speech playback.

mod capture;
mod encoder;
mod playback;
mod queue;

pub use capture::{AudioCapture, SAMPLE_RATE};
pub use encoder::{encode, encode_into};
pub use playback::{AudioPlayback, DEFAULT_PLAYBACK_SAMPLE_RATE, UnitSink};
pub use queue::FrameQueue;
