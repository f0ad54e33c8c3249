//! Voicelink - streaming voice client for a remote assistant
//!
//! This library streams live microphone audio to a transcription service
//! over one bidirectional WebSocket and plays back the synthesized speech
//! the service returns, keeping playback in strict sentence order:
//! - Real-time PCM encoding inside the capture callback
//! - Bounded drop-oldest handoff from the audio thread to the network
//! - Reassembly of interleaved control events and binary audio chunks
//! - A playback sequencer that never plays unit N+1 before unit N
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   f32 blocks   ┌─────────────┐   PCM frames   ┌───────────┐
//! │ mic      ├───────────────►│ encoder     ├───────────────►│ frame     │
//! │ (cpal)   │  capture cb    │ (in-callback)│  drop-oldest  │ queue     │
//! └──────────┘                └─────────────┘                └─────┬─────┘
//!                                                                  │
//!                       ┌──────────────────────────────────────────▼─────┐
//!                       │            WebSocket transport                 │
//!                       │  out: binary frames, stop token                │
//!                       │  in:  control events + audio chunks (ordered)  │
//!                       └──────────────────────┬─────────────────────────┘
//!                                              │
//! ┌──────────┐   ordered units  ┌──────────────▼──┐   chunks by unit id
//! │ speakers │◄─────────────────┤ sequencer       │◄──────────────────────
//! │ (cpal)   │   mp3 decode     │ (strict order)  │   reassembly buffer
//! └──────────┘                  └─────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod reassembly;
pub mod sequencer;
pub mod session;
pub mod transport;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{ServerEvent, StopMode, TextMessage};
pub use reassembly::ReassemblyBuffer;
pub use sequencer::{PlaybackEvent, PlaybackSequencer, PlaybackState};
pub use session::{Session, SessionEvent};
pub use voice::{AudioCapture, AudioPlayback, FrameQueue, UnitSink};
