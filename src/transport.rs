//! WebSocket transport to the transcription service
//!
//! One ordered, reliable, bidirectional channel. Outbound: raw PCM frames
//! as binary messages and the stop token as text. Inbound: control events
//! (text) and audio chunks (binary), yielded in strict arrival order and
//! never merged. Closure or error ends the inbound stream; reconnection is
//! the caller's decision, never attempted here.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::protocol::{StopMode, TextMessage, parse_text_message};
use crate::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One inbound transport event
#[derive(Debug)]
pub enum Inbound {
    /// Classified text frame (control event or transcript line)
    Control(TextMessage),
    /// Raw audio bytes for the currently collecting unit
    Chunk(Vec<u8>),
}

/// Outbound half of the channel
pub struct Outbound {
    sink: SplitSink<WsStream, Message>,
}

/// Inbound half of the channel
pub struct InboundEvents {
    stream: SplitStream<WsStream>,
}

/// Connect to the service and split the channel into its two halves
///
/// # Errors
///
/// Returns error if the WebSocket handshake fails
pub async fn connect(url: &str) -> Result<(Outbound, InboundEvents)> {
    let (ws, response) = connect_async(url)
        .await
        .map_err(|e| Error::Transport(format!("connect to {url} failed: {e}")))?;

    tracing::debug!(url, status = %response.status(), "websocket connected");

    let (sink, stream) = ws.split();
    Ok((Outbound { sink }, InboundEvents { stream }))
}

impl Outbound {
    /// Send one encoded PCM frame as a single binary message
    ///
    /// # Errors
    ///
    /// Returns error if the channel is closed
    pub async fn send_frame(&mut self, frame: Vec<u8>) -> Result<()> {
        self.sink.send(Message::Binary(frame)).await?;
        Ok(())
    }

    /// Send the stop token for `mode` as a text message
    ///
    /// # Errors
    ///
    /// Returns error if the channel is closed
    pub async fn send_stop(&mut self, mode: StopMode) -> Result<()> {
        tracing::debug!(token = mode.as_token(), "sending stop command");
        self.sink
            .send(Message::Text(mode.as_token().to_string()))
            .await?;
        Ok(())
    }

    /// Close the outbound half
    pub async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }
}

impl InboundEvents {
    /// Yield the next inbound event in arrival order
    ///
    /// Returns `None` once the channel is closed or errors; after that the
    /// owning session must tear down and discard partial reassembly state.
    pub async fn next_event(&mut self) -> Option<Inbound> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(Inbound::Control(parse_text_message(&text)));
                }
                Ok(Message::Binary(bytes)) => return Some(Inbound::Chunk(bytes)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "websocket closed by server");
                    return None;
                }
                // Keepalives carry no protocol meaning
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "websocket receive error");
                    return None;
                }
            }
        }
    }
}
