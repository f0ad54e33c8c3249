//! Session lifecycle: capture -> encode -> transport -> reassembly -> playback
//!
//! Exactly one session is active at a time. All reassembly and sequencer
//! state lives here and is touched only from the session's event loop; the
//! frame queue is the single structure shared with the capture callback.
//! State never survives a session: a new `Session` starts from scratch.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;
use crate::config::Config;
use crate::protocol::{ServerEvent, StopMode, TextMessage};
use crate::reassembly::ReassemblyBuffer;
use crate::sequencer::{PlaybackEvent, PlaybackSequencer};
use crate::transport::{self, Inbound, InboundEvents, Outbound};
use crate::voice::{AudioCapture, FrameQueue, UnitSink};

/// Observer notifications emitted over the session's event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport connected and capture started
    Connected,
    /// Transport closed or failed; the session is over
    Disconnected,
    /// Human-readable status line
    Status(String),
    /// In-progress transcript fragment
    TranscriptPartial(String),
    /// Finalized transcript line
    TranscriptFinal(String),
    /// Complete stitched transcription of the captured speech
    TranscriptComplete(String),
    /// Incremental assistant response text
    AssistantDelta(String),
    /// Assistant response text finished
    AssistantComplete,
    /// Server-reported error
    ServerError(String),
    /// Text of the sentence behind audio unit `id`
    UnitText { id: u64, text: String },
    /// Unit `id` started playing
    UnitStarted { id: u64 },
    /// Unit `id` finished playing or was skipped
    UnitEnded { id: u64 },
    /// Every unit has been played or skipped
    AllPlaybackComplete,
}

/// One capture/playback session against the remote service
pub struct Session {
    capture: AudioCapture,
    outbound: Outbound,
    inbound: InboundEvents,
    frames: Arc<FrameQueue>,
    reassembly: ReassemblyBuffer,
    sequencer: PlaybackSequencer,
    sink: Box<dyn UnitSink>,
    playback_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
    events: mpsc::UnboundedSender<SessionEvent>,
    stop_sent: bool,
}

impl Session {
    /// Start a new session: fresh state, transport connected, capture live
    ///
    /// # Errors
    ///
    /// Returns error if the microphone is unavailable (fatal, reported
    /// once, session does not start) or the WebSocket connect fails
    pub async fn start(
        config: &Config,
        sink: Box<dyn UnitSink>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        let frames = Arc::new(FrameQueue::new(config.queue_depth));
        let mut capture = AudioCapture::new(Arc::clone(&frames))?;

        let (outbound, inbound) = transport::connect(&config.server_url).await?;

        let (playback_tx, playback_rx) = mpsc::unbounded_channel();
        let sequencer = PlaybackSequencer::new(playback_tx);

        capture.start()?;
        let _ = events.send(SessionEvent::Connected);
        tracing::info!(url = %config.server_url, "session started");

        Ok(Self {
            capture,
            outbound,
            inbound,
            frames,
            reassembly: ReassemblyBuffer::new(),
            sequencer,
            sink,
            playback_rx,
            events,
            stop_sent: false,
        })
    }

    /// Drive the session until it ends
    ///
    /// Ends when all playback completes after a processing stop, when the
    /// caller requests a discard stop, or when the transport closes. The
    /// capture stream is released before this returns, in every case.
    ///
    /// # Errors
    ///
    /// Returns error on transport faults; the session is torn down first
    pub async fn run(&mut self, control: &mut mpsc::Receiver<StopMode>) -> Result<()> {
        let result = self.run_loop(control).await;

        self.capture.stop();
        self.outbound.close().await;
        self.forward_playback_events();
        let _ = self.events.send(SessionEvent::Disconnected);

        let dropped = self.frames.dropped();
        if dropped > 0 {
            tracing::warn!(dropped, "frames dropped by capture handoff overflow");
        }
        let stray = self.reassembly.stray_chunks();
        if stray > 0 {
            tracing::warn!(stray, "stray audio chunks dropped");
        }

        result
    }

    async fn run_loop(&mut self, control: &mut mpsc::Receiver<StopMode>) -> Result<()> {
        let mut control_open = true;

        loop {
            self.forward_playback_events();
            if self.sequencer.is_complete() {
                tracing::debug!("all playback complete, ending session");
                return Ok(());
            }

            tokio::select! {
                frame = self.frames.pop(), if self.capture.is_capturing() => {
                    self.outbound.send_frame(frame).await?;
                }
                cmd = control.recv(), if control_open => {
                    match cmd {
                        Some(mode) => {
                            self.stop(mode).await?;
                            if mode == StopMode::Discard {
                                return Ok(());
                            }
                        }
                        None => control_open = false,
                    }
                }
                event = self.inbound.next_event() => {
                    match event {
                        Some(inbound) => self.handle_inbound(inbound).await?,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Stop capturing; with [`StopMode::Process`] the server finalizes the
    /// transcript and begins returning results
    ///
    /// Releases the capture stream before returning. Frames still queued
    /// are flushed ahead of the stop token so the transcript stays whole.
    ///
    /// # Errors
    ///
    /// Returns error if the transport rejects the flush or the stop token
    pub async fn stop(&mut self, mode: StopMode) -> Result<()> {
        self.capture.stop();

        while let Some(frame) = self.frames.try_pop() {
            self.outbound.send_frame(frame).await?;
        }

        if !self.stop_sent {
            self.outbound.send_stop(mode).await?;
            self.stop_sent = true;
        }
        Ok(())
    }

    async fn handle_inbound(&mut self, inbound: Inbound) -> Result<()> {
        match inbound {
            Inbound::Chunk(bytes) => {
                self.reassembly.append_chunk(bytes);
            }
            Inbound::Control(message) => self.handle_text_message(message).await?,
        }
        Ok(())
    }

    async fn handle_text_message(&mut self, message: TextMessage) -> Result<()> {
        match message {
            TextMessage::Event(event) => self.handle_server_event(event).await?,
            TextMessage::Partial(text) => {
                let _ = self.events.send(SessionEvent::TranscriptPartial(text));
            }
            TextMessage::Final(text) => {
                let _ = self.events.send(SessionEvent::TranscriptFinal(text));
            }
            TextMessage::CompleteTranscription(text) => {
                let _ = self.events.send(SessionEvent::TranscriptComplete(text));
            }
            TextMessage::Status(text) => {
                let _ = self.events.send(SessionEvent::Status(text));
            }
        }
        Ok(())
    }

    async fn handle_server_event(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::SentenceStart { id, text } => {
                self.reassembly.begin_unit(id);
                let _ = self.events.send(SessionEvent::UnitText { id, text });
            }
            ServerEvent::SentenceEnd { id } => {
                self.reassembly.end_unit(id);
                self.sequencer
                    .advance(&mut self.reassembly, self.sink.as_mut())
                    .await?;
            }
            ServerEvent::AudioComplete => {
                self.sequencer.mark_no_more_units();
                self.sequencer
                    .advance(&mut self.reassembly, self.sink.as_mut())
                    .await?;
            }
            ServerEvent::ProcessingStart { message } => {
                let _ = self.events.send(SessionEvent::Status(message));
            }
            ServerEvent::TextDelta { text } => {
                let _ = self.events.send(SessionEvent::AssistantDelta(text));
            }
            ServerEvent::TextComplete => {
                let _ = self.events.send(SessionEvent::AssistantComplete);
            }
            ServerEvent::Error { message } => {
                let _ = self.events.send(SessionEvent::ServerError(message));
            }
            ServerEvent::Done => {
                let _ = self
                    .events
                    .send(SessionEvent::Status("server session complete".to_string()));
            }
        }
        Ok(())
    }

    /// Map buffered playback progress onto the session event channel
    fn forward_playback_events(&mut self) {
        while let Ok(event) = self.playback_rx.try_recv() {
            let mapped = match event {
                PlaybackEvent::UnitStarted { id } => SessionEvent::UnitStarted { id },
                PlaybackEvent::UnitEnded { id } => SessionEvent::UnitEnded { id },
                PlaybackEvent::AllComplete => SessionEvent::AllPlaybackComplete,
            };
            let _ = self.events.send(mapped);
        }
    }

    /// Frames dropped so far by the capture handoff overflow policy
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.frames.dropped()
    }
}
