//! Streaming pipeline integration tests
//!
//! Exercises encoding, reassembly, and ordered playback together without
//! audio hardware or a live server.

use async_trait::async_trait;
use tokio::sync::mpsc;

use voicelink::protocol::{self, ServerEvent, StopMode, TextMessage};
use voicelink::sequencer::{PlaybackEvent, PlaybackSequencer};
use voicelink::voice::{self, FrameQueue, UnitSink};
use voicelink::{ReassemblyBuffer, Result};

/// Sink that records every unit it is asked to play
struct RecordingSink {
    played: Vec<Vec<u8>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { played: Vec::new() }
    }
}

#[async_trait]
impl UnitSink for RecordingSink {
    async fn play(&mut self, bytes: &[u8]) -> Result<()> {
        self.played.push(bytes.to_vec());
        Ok(())
    }
}

/// Feed one server event through reassembly and the sequencer the way the
/// session's event loop does
async fn apply_event(
    event: ServerEvent,
    buffer: &mut ReassemblyBuffer,
    seq: &mut PlaybackSequencer,
    sink: &mut RecordingSink,
) {
    match event {
        ServerEvent::SentenceStart { id, .. } => buffer.begin_unit(id),
        ServerEvent::SentenceEnd { id } => {
            buffer.end_unit(id);
            seq.advance(buffer, sink).await.unwrap();
        }
        ServerEvent::AudioComplete => {
            seq.mark_no_more_units();
            seq.advance(buffer, sink).await.unwrap();
        }
        _ => {}
    }
}

#[tokio::test]
async fn full_response_plays_in_order_and_completes() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut seq = PlaybackSequencer::new(tx);
    let mut buffer = ReassemblyBuffer::new();
    let mut sink = RecordingSink::new();

    // Two sentences, the second split across chunks, then the terminal event
    apply_event(
        ServerEvent::SentenceStart {
            id: 1,
            text: "Hello.".to_string(),
        },
        &mut buffer,
        &mut seq,
        &mut sink,
    )
    .await;
    buffer.append_chunk(b"A".to_vec());
    apply_event(ServerEvent::SentenceEnd { id: 1 }, &mut buffer, &mut seq, &mut sink).await;

    apply_event(
        ServerEvent::SentenceStart {
            id: 2,
            text: "How can I help?".to_string(),
        },
        &mut buffer,
        &mut seq,
        &mut sink,
    )
    .await;
    buffer.append_chunk(b"B".to_vec());
    buffer.append_chunk(b"C".to_vec());
    apply_event(ServerEvent::SentenceEnd { id: 2 }, &mut buffer, &mut seq, &mut sink).await;

    apply_event(ServerEvent::AudioComplete, &mut buffer, &mut seq, &mut sink).await;

    assert_eq!(sink.played, vec![b"A".to_vec(), b"BC".to_vec()]);
    assert_eq!(seq.next_play_id(), 3);
    assert!(seq.is_complete());
    assert!(buffer.is_empty());

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    assert_eq!(
        events,
        vec![
            PlaybackEvent::UnitStarted { id: 1 },
            PlaybackEvent::UnitEnded { id: 1 },
            PlaybackEvent::UnitStarted { id: 2 },
            PlaybackEvent::UnitEnded { id: 2 },
            PlaybackEvent::AllComplete,
        ]
    );
}

#[tokio::test]
async fn out_of_order_completion_never_reorders_playback() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut seq = PlaybackSequencer::new(tx);
    let mut buffer = ReassemblyBuffer::new();
    let mut sink = RecordingSink::new();

    // Sentence 1 stays open while sentence 2 fully completes
    buffer.begin_unit(1);
    buffer.append_chunk(b"first".to_vec());
    buffer.begin_unit(2);
    buffer.append_chunk(b"second".to_vec());
    apply_event(ServerEvent::SentenceEnd { id: 2 }, &mut buffer, &mut seq, &mut sink).await;

    assert!(sink.played.is_empty());

    apply_event(ServerEvent::SentenceEnd { id: 1 }, &mut buffer, &mut seq, &mut sink).await;
    assert_eq!(sink.played, vec![b"first".to_vec(), b"second".to_vec()]);
}

#[tokio::test]
async fn terminal_event_waits_for_pending_units() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut seq = PlaybackSequencer::new(tx);
    let mut buffer = ReassemblyBuffer::new();
    let mut sink = RecordingSink::new();

    buffer.begin_unit(1);
    buffer.append_chunk(b"late".to_vec());

    // audio_complete arrives while unit 1 is still open: not complete yet
    apply_event(ServerEvent::AudioComplete, &mut buffer, &mut seq, &mut sink).await;
    assert!(sink.played.is_empty());

    apply_event(ServerEvent::SentenceEnd { id: 1 }, &mut buffer, &mut seq, &mut sink).await;
    assert_eq!(sink.played, vec![b"late".to_vec()]);

    let complete_count = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|ev| *ev == PlaybackEvent::AllComplete)
        .count();
    assert_eq!(complete_count, 1, "terminal event must be emitted exactly once");
}

#[test]
fn capture_frames_ride_the_queue_encoded() {
    let queue = FrameQueue::new(8);

    let samples = [0.0_f32, 0.5, -1.0, 1.0];
    queue.push(voice::encode(&samples));

    let frame = queue.try_pop().unwrap();
    assert_eq!(frame.len(), samples.len() * 2);

    let decoded: Vec<i16> = frame
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(decoded, vec![0, 16383, -32768, 32767]);
}

#[test]
fn queue_overflow_drops_oldest_and_counts() {
    let queue = FrameQueue::new(2);

    queue.push(vec![1]);
    queue.push(vec![2]);
    queue.push(vec![3]);

    assert_eq!(queue.dropped(), 1);
    assert_eq!(queue.try_pop(), Some(vec![2]));
    assert_eq!(queue.try_pop(), Some(vec![3]));
    assert_eq!(queue.try_pop(), None);
}

#[test]
fn stop_tokens_match_the_wire_protocol() {
    assert_eq!(StopMode::Discard.as_token(), "STOP_DISCARD");
    assert_eq!(StopMode::Process.as_token(), "STOP_PROCESS");
}

#[test]
fn server_text_frames_classify_correctly() {
    let start = protocol::parse_text_message(
        r#"{"type": "sentence_start", "id": 4, "text": "Sure."}"#,
    );
    assert_eq!(
        start,
        TextMessage::Event(ServerEvent::SentenceStart {
            id: 4,
            text: "Sure.".to_string()
        })
    );

    assert_eq!(
        protocol::parse_text_message(r#"{"type": "audio_complete"}"#),
        TextMessage::Event(ServerEvent::AudioComplete)
    );
    assert_eq!(
        protocol::parse_text_message("PARTIAL: hello wor"),
        TextMessage::Partial("hello wor".to_string())
    );
    assert_eq!(
        protocol::parse_text_message("COMPLETE_TRANSCRIPTION: hello world"),
        TextMessage::CompleteTranscription("hello world".to_string())
    );
    assert_eq!(
        protocol::parse_text_message("Processing..."),
        TextMessage::Status("Processing...".to_string())
    );
}

#[tokio::test]
async fn fresh_state_after_reset_replays_from_one() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut seq = PlaybackSequencer::new(tx);
    let mut buffer = ReassemblyBuffer::new();
    let mut sink = RecordingSink::new();

    buffer.begin_unit(1);
    buffer.append_chunk(b"a".to_vec());
    apply_event(ServerEvent::SentenceEnd { id: 1 }, &mut buffer, &mut seq, &mut sink).await;
    apply_event(ServerEvent::AudioComplete, &mut buffer, &mut seq, &mut sink).await;
    assert!(seq.is_complete());

    buffer.reset();
    seq.reset();

    buffer.begin_unit(1);
    buffer.append_chunk(b"b".to_vec());
    apply_event(ServerEvent::SentenceEnd { id: 1 }, &mut buffer, &mut seq, &mut sink).await;

    assert_eq!(sink.played, vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(seq.next_play_id(), 2);
}
