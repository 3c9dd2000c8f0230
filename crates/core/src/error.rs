//! Error types for browser automation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Browser executable missing, the process died, or the debugging
    /// endpoint never came up.
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    /// Navigation was rejected or the target was unreachable.
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// A bounded wait expired before its condition was met.
    #[error("timed out after {ms}ms waiting for {condition}")]
    Timeout { ms: u64, condition: String },

    /// An auto-retry assertion expired.
    #[error("{0}")]
    AssertionTimeout(String),

    /// The browser answered a command with a protocol error payload.
    #[error("protocol error {code}: {message}")]
    Cdp { code: i64, message: String },

    /// The browser sent something the protocol layer cannot account for.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// An evaluated expression threw in the page.
    #[error("JavaScript exception: {0}")]
    JsException(String),

    /// No element matched a locator's selector when one was required.
    #[error("no element matches selector {0:?}")]
    ElementNotFound(String),

    /// The connection closed before a response arrived.
    #[error("connection closed before response arrived")]
    ChannelClosed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("websocket transport error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
    /// Returns `true` for bounded-wait and assertion expiries.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::AssertionTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classification() {
        let timeout = Error::Timeout {
            ms: 30000,
            condition: "selector .card".to_string(),
        };
        assert!(timeout.is_timeout());
        assert!(Error::AssertionTimeout("expired".to_string()).is_timeout());
        assert!(
            !Error::Cdp {
                code: -32000,
                message: "boom".to_string()
            }
            .is_timeout()
        );
    }

    #[test]
    fn timeout_message_names_condition_and_elapsed_ms() {
        let error = Error::Timeout {
            ms: 5000,
            condition: "selector #viewer-modal".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("5000ms"));
        assert!(message.contains("#viewer-modal"));
    }
}
