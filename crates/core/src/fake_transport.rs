//! Fake transport for unit testing command correlation and event dispatch.
//!
//! Provides an in-memory transport for testing the protocol layer without
//! a browser.
//!
//! # Example
//!
//! ```ignore
//! let (parts, controller) = FakeTransportBuilder::new().build();
//! let connection = Arc::new(Connection::new(parts));
//!
//! tokio::spawn({
//!     let conn = Arc::clone(&connection);
//!     async move { conn.run().await }
//! });
//!
//! let fut = connection.send("Page.navigate", json!({"url": "..."}), None);
//! controller.inject_response(0, json!({"frameId": "F1"}));
//! let result = fut.await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, mpsc};

use crate::error::Result;
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Builder for creating fake transport instances.
pub struct FakeTransportBuilder {
    // Nothing needed for now, but allows future extensibility
}

impl FakeTransportBuilder {
    /// Create a new fake transport builder.
    pub fn new() -> Self {
        Self {}
    }

    /// Build the fake transport and return both parts and a controller.
    ///
    /// Returns [`TransportParts`] for creating a [`Connection`] and a
    /// [`FakeTransportController`] for injecting messages and inspecting
    /// sent commands.
    ///
    /// [`Connection`]: crate::connection::Connection
    pub fn build(self) -> (TransportParts, FakeTransportController) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let sent_messages = Arc::new(Mutex::new(Vec::new()));

        let sender = FakeTransportSender {
            sent: Arc::clone(&sent_messages),
        };

        let receiver = FakeTransportReceiver {
            inbound_rx,
            message_tx,
        };

        let controller = FakeTransportController {
            inbound_tx,
            sent: sent_messages,
        };

        let parts = TransportParts {
            sender: Box::new(sender),
            receiver: Box::new(receiver),
            message_rx,
        };

        (parts, controller)
    }
}

impl Default for FakeTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller for injecting responses/events and inspecting sent messages.
#[derive(Clone)]
pub struct FakeTransportController {
    inbound_tx: mpsc::UnboundedSender<JsonValue>,
    sent: Arc<Mutex<Vec<JsonValue>>>,
}

impl FakeTransportController {
    /// Inject a raw JSON message into the connection.
    ///
    /// Use this to simulate receiving a message from the browser.
    pub fn inject(&self, message: JsonValue) {
        let _ = self.inbound_tx.send(message);
    }

    /// Inject a response message with the given ID and result.
    pub fn inject_response(&self, id: u32, result: JsonValue) {
        self.inject(serde_json::json!({
            "id": id,
            "result": result
        }));
    }

    /// Inject a CDP error response message.
    pub fn inject_error(&self, id: u32, code: i64, message: &str) {
        self.inject(serde_json::json!({
            "id": id,
            "error": {
                "code": code,
                "message": message
            }
        }));
    }

    /// Inject an event message scoped to a session.
    pub fn inject_event(&self, session_id: &str, method: &str, params: JsonValue) {
        self.inject(serde_json::json!({
            "method": method,
            "params": params,
            "sessionId": session_id
        }));
    }

    /// Inject a browser-level event message (no session).
    pub fn inject_browser_event(&self, method: &str, params: JsonValue) {
        self.inject(serde_json::json!({
            "method": method,
            "params": params
        }));
    }

    /// Take all sent messages, clearing the buffer.
    pub async fn take_sent(&self) -> Vec<JsonValue> {
        std::mem::take(&mut *self.sent.lock().await)
    }
}

struct FakeTransportSender {
    sent: Arc<Mutex<Vec<JsonValue>>>,
}

impl Transport for FakeTransportSender {
    fn send(
        &mut self,
        message: JsonValue,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let sent = Arc::clone(&self.sent);
        Box::pin(async move {
            sent.lock().await.push(message);
            Ok(())
        })
    }
}

struct FakeTransportReceiver {
    inbound_rx: mpsc::UnboundedReceiver<JsonValue>,
    message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl TransportReceiver for FakeTransportReceiver {
    fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        Box::pin(async move {
            while let Some(message) = self.inbound_rx.recv().await {
                if self.message_tx.send(message).is_err() {
                    break;
                }
            }
            Ok(())
        })
    }
}
