//! Transport layer: one JSON message per WebSocket text frame.
//!
//! The DevTools endpoint speaks JSON messages over a single WebSocket. The
//! transport is split at the same seam the rest of the crate relies on: a
//! boxed sender, a boxed receiver loop, and an unbounded channel carrying
//! inbound messages to the connection's dispatch loop. Tests swap the whole
//! thing for [`crate::fake_transport`].

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::Result;

/// Outbound half of a transport.
pub trait Transport: Send {
    /// Serializes and sends one message.
    fn send(
        &mut self,
        message: JsonValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Inbound half of a transport.
///
/// `run` pumps frames into the message channel until the peer goes away.
pub trait TransportReceiver: Send {
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// The pieces a [`crate::Connection`] is built from.
pub struct TransportParts {
    pub sender: Box<dyn Transport>,
    pub receiver: Box<dyn TransportReceiver>,
    pub message_rx: mpsc::UnboundedReceiver<JsonValue>,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// WebSocket transport for a DevTools debugging endpoint.
pub struct WebSocketTransport {
    sink: WsSink,
    stream: WsStream,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl WebSocketTransport {
    /// Connects to `url` (a `ws://.../devtools/browser/...` endpoint).
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<JsonValue>)> {
        let (ws, _response) = connect_async(url).await?;
        let (sink, stream) = ws.split();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                sink,
                stream,
                message_tx,
            },
            message_rx,
        ))
    }

    /// Splits the transport into the parts a connection consumes.
    pub fn into_transport_parts(
        self,
        message_rx: mpsc::UnboundedReceiver<JsonValue>,
    ) -> TransportParts {
        TransportParts {
            sender: Box::new(WebSocketSender { sink: self.sink }),
            receiver: Box::new(WebSocketReceiver {
                stream: self.stream,
                message_tx: self.message_tx,
            }),
            message_rx,
        }
    }
}

struct WebSocketSender {
    sink: WsSink,
}

impl Transport for WebSocketSender {
    fn send(
        &mut self,
        message: JsonValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let text = serde_json::to_string(&message)?;
            self.sink.send(WsMessage::Text(text.into())).await?;
            Ok(())
        })
    }
}

struct WebSocketReceiver {
    stream: WsStream,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl TransportReceiver for WebSocketReceiver {
    fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
            while let Some(frame) = self.stream.next().await {
                match frame? {
                    WsMessage::Text(text) => {
                        let value: JsonValue = match serde_json::from_str(&text) {
                            Ok(value) => value,
                            Err(error) => {
                                tracing::warn!(%error, "discarding unparseable frame");
                                continue;
                            }
                        };
                        if self.message_tx.send(value).is_err() {
                            break;
                        }
                    }
                    WsMessage::Close(_) => break,
                    // DevTools endpoints only send text frames; pings are
                    // answered by tungstenite itself.
                    _ => {}
                }
            }
            Ok(())
        })
    }
}
