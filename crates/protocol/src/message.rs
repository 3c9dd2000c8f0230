//! CDP message framing.
//!
//! Every message on the wire is a single JSON object. Commands carry an
//! `id` chosen by the client; the matching response echoes it back. Events
//! have no `id`. Messages scoped to an attached page target additionally
//! carry a `sessionId` (flat session mode).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command message sent to the browser.
///
/// ```json
/// {
///   "id": 42,
///   "method": "Page.navigate",
///   "params": { "url": "http://localhost:8000" },
///   "sessionId": "8C5C6D0B2B3F5F2E4A7B9C1D"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID for correlating responses
    pub id: u32,
    /// Method name to invoke (e.g. "Page.navigate")
    pub method: String,
    /// Method parameters as JSON object
    pub params: Value,
    /// Session ID of the target this command addresses, if any
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response message from the browser.
///
/// Exactly one of `result` and `error` is present:
/// ```json
/// { "id": 42, "result": { "frameId": "..." } }
/// { "id": 42, "error": { "code": -32000, "message": "Cannot navigate" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response correlates to
    pub id: u32,
    /// Success result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error result (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    /// Session the response belongs to, echoed back for session commands
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Protocol error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// JSON-RPC style error code (e.g. -32000)
    pub code: i64,
    /// Error message
    pub message: String,
}

/// Event message emitted by the browser.
///
/// Events are distinguished from responses by the absence of an `id` field:
/// ```json
/// {
///   "method": "Runtime.consoleAPICalled",
///   "params": { "type": "log", "args": [{ "value": "hello" }] },
///   "sessionId": "8C5C6D0B2B3F5F2E4A7B9C1D"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event method name
    pub method: String,
    /// Event parameters as JSON object
    #[serde(default)]
    pub params: Value,
    /// Session the event originated from, absent for browser-level events
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Discriminated union of protocol messages.
///
/// Uses serde's `untagged` to distinguish based on presence of `id`:
/// messages with `id` are responses, messages without are events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Response message (has `id` field)
    Response(Response),
    /// Event message (no `id` field)
    Event(Event),
}
