//! Wire protocol for the transcription WebSocket
//!
//! The channel carries two message kinds that are never merged: text frames
//! (JSON control events or legacy prefixed transcript lines) and binary
//! frames (raw audio bytes). Outbound audio is one PCM frame per binary
//! message with no header; the only outbound text is one of the two stop
//! tokens.

use serde::Deserialize;

/// Prefix for a partial (in-progress) transcript line
const PARTIAL_PREFIX: &str = "PARTIAL: ";
/// Prefix for a finalized transcript line
const FINAL_PREFIX: &str = "FINAL: ";
/// Prefix for the complete stitched transcription
const COMPLETE_PREFIX: &str = "COMPLETE_TRANSCRIPTION: ";

/// How a session's capture phase is ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Tear down without requesting processing
    Discard,
    /// Ask the server to finalize the transcript and return results
    Process,
}

impl StopMode {
    /// The literal token sent as a text frame, at most once per session
    #[must_use]
    pub const fn as_token(self) -> &'static str {
        match self {
            Self::Discard => "STOP_DISCARD",
            Self::Process => "STOP_PROCESS",
        }
    }
}

/// Structured control event sent by the server as a JSON text frame
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Begin collecting audio chunks for unit `id`; `text` is the sentence
    /// the audio was synthesized from
    SentenceStart { id: u64, text: String },
    /// No further chunks will arrive for unit `id`
    SentenceEnd { id: u64 },
    /// No more units will arrive this session
    AudioComplete,
    /// The server started processing the finalized transcript
    ProcessingStart { message: String },
    /// Incremental assistant response text (teleprompter feed)
    TextDelta { text: String },
    /// Assistant response text is complete
    TextComplete,
    /// Server-side error report
    Error { message: String },
    /// Server is done with the session and will close
    #[serde(rename = "DONE")]
    Done,
}

/// Classified inbound text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMessage {
    /// A parsed JSON control event
    Event(ServerEvent),
    /// Partial transcript line
    Partial(String),
    /// Final transcript line
    Final(String),
    /// Complete stitched transcription
    CompleteTranscription(String),
    /// Anything else: surfaced as a status line
    Status(String),
}

/// Classify an inbound text frame
///
/// JSON is tried first; non-JSON (or JSON with an unknown `type`) falls
/// back to the legacy prefixed transcript lines, then to a bare status
/// line. The server is the sole source of ordering truth, so nothing here
/// reorders or merges messages.
#[must_use]
pub fn parse_text_message(text: &str) -> TextMessage {
    if let Ok(event) = serde_json::from_str::<ServerEvent>(text) {
        return TextMessage::Event(event);
    }

    if let Some(rest) = text.strip_prefix(PARTIAL_PREFIX) {
        TextMessage::Partial(rest.to_string())
    } else if let Some(rest) = text.strip_prefix(FINAL_PREFIX) {
        TextMessage::Final(rest.to_string())
    } else if let Some(rest) = text.strip_prefix(COMPLETE_PREFIX) {
        TextMessage::CompleteTranscription(rest.to_string())
    } else {
        TextMessage::Status(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_start_deserializes() {
        let json = r#"{"type":"sentence_start","id":3,"text":"Hello there."}"#;
        let msg = parse_text_message(json);
        assert_eq!(
            msg,
            TextMessage::Event(ServerEvent::SentenceStart {
                id: 3,
                text: "Hello there.".to_string()
            })
        );
    }

    #[test]
    fn sentence_end_deserializes() {
        let json = r#"{"type":"sentence_end","id":3}"#;
        let msg = parse_text_message(json);
        assert_eq!(msg, TextMessage::Event(ServerEvent::SentenceEnd { id: 3 }));
    }

    #[test]
    fn audio_complete_deserializes() {
        let msg = parse_text_message(r#"{"type":"audio_complete"}"#);
        assert_eq!(msg, TextMessage::Event(ServerEvent::AudioComplete));
    }

    #[test]
    fn uppercase_done_deserializes() {
        let msg = parse_text_message(r#"{"type":"DONE"}"#);
        assert_eq!(msg, TextMessage::Event(ServerEvent::Done));
    }

    #[test]
    fn text_delta_deserializes() {
        let msg = parse_text_message(r#"{"type":"text_delta","text":"Hi"}"#);
        assert_eq!(
            msg,
            TextMessage::Event(ServerEvent::TextDelta {
                text: "Hi".to_string()
            })
        );
    }

    #[test]
    fn processing_events_deserialize() {
        assert_eq!(
            parse_text_message(r#"{"type":"processing_start","message":"Thinking..."}"#),
            TextMessage::Event(ServerEvent::ProcessingStart {
                message: "Thinking...".to_string()
            })
        );
        assert_eq!(
            parse_text_message(r#"{"type":"text_complete"}"#),
            TextMessage::Event(ServerEvent::TextComplete)
        );
        assert_eq!(
            parse_text_message(r#"{"type":"error","message":"synthesis failed"}"#),
            TextMessage::Event(ServerEvent::Error {
                message: "synthesis failed".to_string()
            })
        );
    }

    #[test]
    fn legacy_prefixes_parse() {
        assert_eq!(
            parse_text_message("PARTIAL: hello wor"),
            TextMessage::Partial("hello wor".to_string())
        );
        assert_eq!(
            parse_text_message("FINAL: hello world"),
            TextMessage::Final("hello world".to_string())
        );
        assert_eq!(
            parse_text_message("COMPLETE_TRANSCRIPTION: hello world again"),
            TextMessage::CompleteTranscription("hello world again".to_string())
        );
    }

    #[test]
    fn bare_text_becomes_status() {
        assert_eq!(
            parse_text_message("Connection established."),
            TextMessage::Status("Connection established.".to_string())
        );
    }

    #[test]
    fn unknown_json_type_becomes_status() {
        let text = r#"{"type":"heartbeat"}"#;
        assert_eq!(parse_text_message(text), TextMessage::Status(text.to_string()));
    }

    #[test]
    fn stop_tokens_are_exact() {
        assert_eq!(StopMode::Discard.as_token(), "STOP_DISCARD");
        assert_eq!(StopMode::Process.as_token(), "STOP_PROCESS");
    }
}
