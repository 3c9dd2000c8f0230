//! Page - one browsing context attached as a flat CDP session.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use vv_protocol::{Event, decode_base64_payload};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::locator::Locator;

/// Poll interval for readiness and selector waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A console message emitted by the page.
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    kind: String,
    text: String,
}

impl ConsoleMessage {
    /// Message kind as reported by the page ("log", "error", ...).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Flattened argument text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn from_params(params: &Value) -> Self {
        let kind = params
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("log")
            .to_string();

        let text = params
            .get("args")
            .and_then(Value::as_array)
            .map(|args| {
                args.iter()
                    .map(remote_object_text)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        Self { kind, text }
    }
}

/// Renders a CDP RemoteObject the way the page's console would.
fn remote_object_text(arg: &Value) -> String {
    match arg.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(value) if !value.is_null() => value.to_string(),
        _ => arg
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

type ConsoleHook = Box<dyn Fn(&ConsoleMessage) + Send + Sync>;

/// Options for screenshot capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenshotOptions {
    /// Capture the full scrollable page instead of just the viewport.
    pub full_page: bool,
}

/// One logical browsing context within a browser session.
///
/// Cheap to clone; all clones address the same CDP session.
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

struct PageInner {
    connection: Arc<Connection>,
    session_id: String,
    #[allow(dead_code)]
    target_id: String,
    console_hooks: Arc<Mutex<Vec<ConsoleHook>>>,
    default_timeout: Mutex<Duration>,
}

impl Page {
    /// Attaches to an existing flat-protocol session.
    ///
    /// Subscribes to the session's event stream and starts the event pump.
    /// [`crate::Browser::new_page`] is the usual entry point; tests attach
    /// directly over a fake transport.
    pub fn attach(connection: Arc<Connection>, session_id: String, target_id: String) -> Self {
        let console_hooks: Arc<Mutex<Vec<ConsoleHook>>> = Arc::new(Mutex::new(Vec::new()));
        let events = connection.subscribe(&session_id);

        let hooks = Arc::clone(&console_hooks);
        tokio::spawn(async move {
            pump_events(events, hooks).await;
        });

        Self {
            inner: Arc::new(PageInner {
                connection,
                session_id,
                target_id,
                console_hooks,
                default_timeout: Mutex::new(crate::DEFAULT_TIMEOUT),
            }),
        }
    }

    /// Enables the protocol domains the page relies on.
    ///
    /// `Runtime.enable` is what makes the browser start emitting
    /// `consoleAPICalled` events.
    pub async fn enable(&self) -> Result<()> {
        self.send("Runtime.enable", json!({})).await.map(|_| ())
    }

    /// Timeout applied to navigation and element waits.
    pub fn default_timeout(&self) -> Duration {
        *self.inner.default_timeout.lock()
    }

    pub fn set_default_timeout(&self, timeout: Duration) {
        *self.inner.default_timeout.lock() = timeout;
    }

    /// Registers a hook invoked once per in-page console message, in
    /// emission order. Purely observational; never affects control flow.
    pub fn on_console<F>(&self, hook: F)
    where
        F: Fn(&ConsoleMessage) + Send + Sync + 'static,
    {
        self.inner.console_hooks.lock().push(Box::new(hook));
    }

    /// Navigates to `url` and waits for the document to finish loading.
    pub async fn goto(&self, url: &str) -> Result<()> {
        let result = self
            .send("Page.navigate", json!({"url": url}))
            .await
            .map_err(|e| Error::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(Error::Navigation {
                    url: url.to_string(),
                    message: error_text.to_string(),
                });
            }
        }

        let timeout = self.default_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            if self.evaluate("document.readyState").await? == json!("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    ms: timeout.as_millis() as u64,
                    condition: format!("load of {url}"),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Evaluates a JavaScript expression and returns its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .send(
                "Runtime.evaluate",
                json!({"expression": expression, "returnByValue": true}),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown JavaScript exception");
            return Err(Error::JsException(text.to_string()));
        }

        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Suspends until at least one element matches `selector`.
    ///
    /// Bounded by the page default timeout; the timeout error names the
    /// selector.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        let timeout = self.default_timeout();
        let deadline = Instant::now() + timeout;
        let expression = format!(
            "document.querySelector({}) !== null",
            js_quote(selector)
        );

        loop {
            if self.evaluate(&expression).await? == Value::Bool(true) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    ms: timeout.as_millis() as u64,
                    condition: format!("selector {selector}"),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Selector-addressed handle for assertions and interactions.
    pub fn locator(&self, selector: &str) -> Locator {
        Locator::new(self.clone(), selector)
    }

    /// Captures a PNG screenshot and returns its bytes.
    pub async fn screenshot(&self, options: ScreenshotOptions) -> Result<Vec<u8>> {
        let mut params = json!({"format": "png"});

        if options.full_page {
            let metrics = self.send("Page.getLayoutMetrics", json!({})).await?;
            let size = metrics.get("cssContentSize").ok_or_else(|| {
                Error::Protocol("Page.getLayoutMetrics returned no cssContentSize".to_string())
            })?;
            params["clip"] = json!({
                "x": 0,
                "y": 0,
                "width": size["width"],
                "height": size["height"],
                "scale": 1,
            });
            params["captureBeyondViewport"] = json!(true);
        }

        let result = self.send("Page.captureScreenshot", params).await?;
        let data = result.get("data").and_then(Value::as_str).ok_or_else(|| {
            Error::Protocol("Page.captureScreenshot returned no data".to_string())
        })?;

        decode_base64_payload(data)
            .map_err(|e| Error::Protocol(format!("invalid screenshot payload: {e}")))
    }

    /// Captures a screenshot to `path`, overwriting any prior capture.
    pub async fn screenshot_to_file(
        &self,
        path: &Path,
        options: ScreenshotOptions,
    ) -> Result<()> {
        let bytes = self.screenshot(options).await?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Dispatches a trusted left-button click at viewport coordinates.
    pub(crate) async fn dispatch_mouse_click(&self, x: f64, y: f64) -> Result<()> {
        self.send(
            "Input.dispatchMouseEvent",
            json!({"type": "mouseMoved", "x": x, "y": y}),
        )
        .await?;
        for event_type in ["mousePressed", "mouseReleased"] {
            self.send(
                "Input.dispatchMouseEvent",
                json!({
                    "type": event_type,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                }),
            )
            .await?;
        }
        Ok(())
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.inner
            .connection
            .send(method, params, Some(&self.inner.session_id))
            .await
    }
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<Event>,
    hooks: Arc<Mutex<Vec<ConsoleHook>>>,
) {
    while let Some(event) = events.recv().await {
        match event.method.as_str() {
            "Runtime.consoleAPICalled" => {
                let message = ConsoleMessage::from_params(&event.params);
                for hook in hooks.lock().iter() {
                    hook(&message);
                }
            }
            _ => {
                tracing::trace!(method = %event.method, "page event");
            }
        }
    }
}

/// Quotes a string as a JavaScript string literal.
pub(crate) fn js_quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_message_flattens_arguments() {
        let params = json!({
            "type": "log",
            "args": [
                {"type": "string", "value": "model loaded:"},
                {"type": "number", "value": 3},
                {"type": "object", "description": "HTMLCanvasElement"}
            ]
        });
        let message = ConsoleMessage::from_params(&params);
        assert_eq!(message.kind(), "log");
        assert_eq!(message.text(), "model loaded: 3 HTMLCanvasElement");
    }

    #[test]
    fn console_message_defaults_for_sparse_params() {
        let message = ConsoleMessage::from_params(&json!({}));
        assert_eq!(message.kind(), "log");
        assert_eq!(message.text(), "");
    }

    #[test]
    fn js_quote_escapes_embedded_quotes() {
        let quoted = js_quote(r#".modal[style*="z-index: 1001"]"#);
        assert_eq!(quoted, r#"".modal[style*=\"z-index: 1001\"]""#);
    }
}
