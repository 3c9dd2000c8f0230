// vv: Headless Chromium automation over the Chrome DevTools Protocol.
//
// The crate talks to a launched (or already running) Chromium over its
// WebSocket debugging endpoint: transport frames JSON messages, the
// connection correlates commands with responses and routes events, and the
// protocol objects (Browser, Page, Locator) expose the operations the
// verification runner needs.

pub mod assertions;
pub mod browser;
pub mod connection;
pub mod error;
pub mod fake_transport;
pub mod launcher;
pub mod locator;
pub mod page;
pub mod transport;

use std::time::Duration;

/// Default timeout for page-level operations.
///
/// Matches the 30-second default mainstream browser automation tooling
/// ships with.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub use assertions::expect;
pub use browser::{Browser, LaunchOptions};
pub use connection::Connection;
pub use error::{Error, Result};
pub use fake_transport::{FakeTransportBuilder, FakeTransportController};
pub use locator::Locator;
pub use page::{ConsoleMessage, Page, ScreenshotOptions};
pub use transport::{Transport, TransportParts, TransportReceiver, WebSocketTransport};
