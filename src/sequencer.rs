//! Ordered playback of assembled audio units
//!
//! Units play in strictly ascending id order no matter which order they
//! completed in; the play cursor advances by exactly one per completed or
//! skipped unit. An explicit state machine with a single `advance` entry
//! point, driven from both the "unit became ready" and "playback finished"
//! triggers.

use tokio::sync::mpsc;

use crate::Result;
use crate::reassembly::ReassemblyBuffer;
use crate::voice::UnitSink;

/// Playback progress notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Unit `id` started playing
    UnitStarted { id: u64 },
    /// Unit `id` finished playing (or was skipped as undecodable)
    UnitEnded { id: u64 },
    /// Every unit the server will ever send has been played or skipped
    AllComplete,
}

/// Sequencer playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Waiting for the next unit to become ready
    Idle,
    /// A unit is currently being decoded or played
    Playing(u64),
}

/// State machine enforcing strict ascending-id playback order
pub struct PlaybackSequencer {
    state: PlaybackState,
    next_play_id: u64,
    no_more_units: bool,
    complete_emitted: bool,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackSequencer {
    /// Create a sequencer emitting progress on `events`
    #[must_use]
    pub fn new(events: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self {
            state: PlaybackState::Idle,
            next_play_id: 1,
            no_more_units: false,
            complete_emitted: false,
            events,
        }
    }

    /// Current playback state
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Smallest unit id not yet played or skipped
    #[must_use]
    pub const fn next_play_id(&self) -> u64 {
        self.next_play_id
    }

    /// Record the server's "no more units will arrive" signal
    pub fn mark_no_more_units(&mut self) {
        self.no_more_units = true;
    }

    /// Whether the terminal all-complete notification has been emitted
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete_emitted
    }

    /// Play every consecutively ready unit starting at the play cursor
    ///
    /// Called when a unit becomes ready and again after each playback
    /// completes. A call that arrives while a unit is playing is ignored;
    /// advancement happens only from completion. An undecodable unit is
    /// skipped and never stalls the sequence.
    ///
    /// # Errors
    ///
    /// Sink failures are treated as skips rather than faults, so this
    /// currently always returns `Ok`; the signature leaves room for sinks
    /// whose errors must abort the session.
    pub async fn advance(
        &mut self,
        buffer: &mut ReassemblyBuffer,
        sink: &mut dyn UnitSink,
    ) -> Result<()> {
        if matches!(self.state, PlaybackState::Playing(_)) {
            return Ok(());
        }

        while buffer.is_ready(self.next_play_id) {
            let id = self.next_play_id;
            let Some(bytes) = buffer.take(id) else {
                break;
            };

            self.state = PlaybackState::Playing(id);
            let _ = self.events.send(PlaybackEvent::UnitStarted { id });

            if let Err(e) = sink.play(&bytes).await {
                tracing::warn!(id, error = %e, "skipping unplayable unit");
            }

            let _ = self.events.send(PlaybackEvent::UnitEnded { id });
            self.state = PlaybackState::Idle;
            self.next_play_id += 1;
        }

        if self.no_more_units && !self.complete_emitted {
            self.complete_emitted = true;
            let _ = self.events.send(PlaybackEvent::AllComplete);
            tracing::debug!(next_play_id = self.next_play_id, "all playback complete");
        }

        Ok(())
    }

    /// Wipe back to the initial state (play cursor at 1, nothing emitted)
    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.next_play_id = 1;
        self.no_more_units = false;
        self.complete_emitted = false;
    }
}
