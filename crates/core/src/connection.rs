//! Connection layer for the DevTools protocol.
//!
//! This module implements the request/response correlation layer on top of
//! the transport. It handles:
//! - Generating unique command IDs
//! - Correlating responses with pending commands
//! - Distinguishing events from responses
//! - Routing session-scoped events to their subscribers
//!
//! # Message Flow
//!
//! 1. Client calls `send()` with method, params, and an optional session
//! 2. Connection generates a unique ID and creates a oneshot channel
//! 3. Command is serialized and sent via transport
//! 4. Client awaits on the oneshot receiver
//! 5. Dispatch loop receives the response from the transport
//! 6. Response is correlated by ID and completed via the oneshot channel
//!
//! Events carry no ID. They are routed by their `sessionId` to whichever
//! page subscribed to that session; browser-level events (no session) use
//! the empty key.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use vv_protocol::{Event, Message, Request};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

type Inbox = (
    Box<dyn TransportReceiver>,
    mpsc::UnboundedReceiver<Value>,
);

/// Connection to a Chromium debugging endpoint.
///
/// Manages command correlation and event routing. Thread-safe; share across
/// tasks with `Arc`. Multiple concurrent commands are supported, though the
/// verification runner only ever has one in flight.
pub struct Connection {
    /// Sequential command ID counter (atomic for thread safety)
    last_id: AtomicU32,
    /// Pending command callbacks keyed by command ID
    callbacks: Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>,
    /// Outbound transport half
    sender: Mutex<Box<dyn Transport>>,
    /// Inbound half, taken exactly once by `run()`
    inbox: SyncMutex<Option<Inbox>>,
    /// Event subscribers keyed by session ID ("" for browser-level events)
    subscribers: SyncMutex<HashMap<String, mpsc::UnboundedSender<Event>>>,
}

impl Connection {
    /// Create a new connection from transport parts.
    pub fn new(parts: TransportParts) -> Self {
        Self {
            last_id: AtomicU32::new(0),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
            sender: Mutex::new(parts.sender),
            inbox: SyncMutex::new(Some((parts.receiver, parts.message_rx))),
            subscribers: SyncMutex::new(HashMap::new()),
        }
    }

    /// Send a command and await its response.
    ///
    /// `session_id` scopes the command to an attached target (flat session
    /// mode); `None` addresses the browser itself.
    ///
    /// # Errors
    ///
    /// - transport send fails
    /// - the browser returns a protocol error payload
    /// - the connection closes before the response arrives
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value> {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        self.callbacks.lock().await.insert(id, tx);

        let request = Request {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };

        let request_value = serde_json::to_value(&request)?;
        self.sender.lock().await.send(request_value).await?;

        rx.await
            .map_err(|_| Error::ChannelClosed)
            .and_then(|result| result)
    }

    /// Subscribe to events for a session.
    ///
    /// Use the empty string for browser-level events. A later subscription
    /// for the same session replaces the earlier one.
    pub fn subscribe(&self, session_id: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().insert(session_id.to_string(), tx);
        rx
    }

    /// Run the message dispatch loop.
    ///
    /// Continuously reads messages from the transport and dispatches them:
    /// responses are correlated with pending commands, events routed to
    /// session subscribers. Runs until the transport closes; callers left
    /// waiting at that point receive [`Error::ChannelClosed`]. Spawn this in
    /// a background task.
    pub async fn run(&self) {
        let (receiver, mut message_rx) = self
            .inbox
            .lock()
            .take()
            .expect("run() can only be called once");

        let receiver_handle = tokio::spawn(async move {
            if let Err(error) = receiver.run().await {
                tracing::error!(%error, "transport error");
            }
        });

        while let Some(message_value) = message_rx.recv().await {
            match serde_json::from_value::<Message>(message_value.clone()) {
                Ok(message) => {
                    if let Err(error) = self.dispatch(message).await {
                        tracing::error!(%error, "error dispatching message");
                    }
                }
                Err(error) => {
                    tracing::error!(%error, message = %message_value, "failed to parse message");
                }
            }
        }

        tracing::debug!("message loop ended (transport closed)");
        let _ = receiver_handle.await;

        // Fail any callers still waiting on the closed transport.
        for (_, callback) in self.callbacks.lock().await.drain() {
            let _ = callback.send(Err(Error::ChannelClosed));
        }
    }

    /// Dispatch an incoming message from the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if a response ID doesn't match any pending command.
    /// Events for sessions nobody subscribed to are logged and discarded.
    async fn dispatch(&self, message: Message) -> Result<()> {
        match message {
            Message::Response(response) => {
                let callback = self
                    .callbacks
                    .lock()
                    .await
                    .remove(&response.id)
                    .ok_or_else(|| {
                        Error::Protocol(format!(
                            "cannot find command to respond: id={}",
                            response.id
                        ))
                    })?;

                let result = match response.error {
                    Some(payload) => Err(Error::Cdp {
                        code: payload.code,
                        message: payload.message,
                    }),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };

                // Complete the oneshot channel (ignore if receiver was dropped)
                let _ = callback.send(result);
                Ok(())
            }
            Message::Event(event) => {
                let key = event.session_id.clone().unwrap_or_default();
                let subscriber = self.subscribers.lock().get(&key).cloned();
                match subscriber {
                    Some(tx) => {
                        if tx.send(event).is_err() {
                            self.subscribers.lock().remove(&key);
                        }
                    }
                    None => {
                        tracing::debug!(method = %event.method, session = %key, "unrouted event");
                    }
                }
                Ok(())
            }
        }
    }
}
