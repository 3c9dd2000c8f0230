//! Browser session lifecycle.
//!
//! A [`Browser`] owns a launched Chromium process and the connection to its
//! debugging endpoint. The process sits behind a guard whose `Drop` kills a
//! still-running browser, so the resource is released on every exit path,
//! not only the orderly `close()` one.

use std::path::PathBuf;
use std::process::Child;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::launcher;
use crate::page::Page;
use crate::transport::WebSocketTransport;

/// Options for [`Browser::launch`].
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Run without a window. Defaults to `true`.
    pub headless: Option<bool>,
    /// Explicit browser executable instead of auto-discovery.
    pub executable: Option<PathBuf>,
    /// Explicit debugging port instead of scanning for a free one.
    pub remote_debugging_port: Option<u16>,
}

/// A running browser instance reached over its debugging endpoint.
pub struct Browser {
    connection: Arc<Connection>,
    process: Option<ProcessGuard>,
    version: Option<String>,
}

struct ProcessGuard {
    child: Child,
    user_data_dir: PathBuf,
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        let _ = std::fs::remove_dir_all(&self.user_data_dir);
    }
}

impl Browser {
    /// Launches a Chromium instance and connects to it.
    ///
    /// Fails if no executable can be found, the process dies during
    /// startup, or the debugging endpoint never answers.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let executable = match options.executable {
            Some(path) => path.display().to_string(),
            None => launcher::find_chrome_executable().ok_or_else(|| {
                Error::BrowserLaunch(
                    "could not find a Chrome/Chromium executable; install one or pass an explicit path"
                        .to_string(),
                )
            })?,
        };

        let port = match options.remote_debugging_port {
            Some(port) => port,
            None => launcher::pick_debug_port().ok_or_else(|| {
                Error::BrowserLaunch("no free port for the debugging endpoint".to_string())
            })?,
        };

        let user_data_dir =
            std::env::temp_dir().join(format!("vv-profile-{}-{port}", std::process::id()));
        std::fs::create_dir_all(&user_data_dir)?;

        let headless = options.headless.unwrap_or(true);
        debug!(%executable, port, headless, "launching browser");

        let (child, info) =
            launcher::launch_chromium(&executable, port, headless, &user_data_dir).await?;

        let (transport, message_rx) =
            WebSocketTransport::connect(&info.web_socket_debugger_url).await?;
        let parts = transport.into_transport_parts(message_rx);
        let connection = Arc::new(Connection::new(parts));

        let conn = Arc::clone(&connection);
        tokio::spawn(async move {
            conn.run().await;
        });

        debug!(browser = info.browser.as_deref().unwrap_or("unknown"), "connected");

        Ok(Self {
            connection,
            process: Some(ProcessGuard {
                child,
                user_data_dir,
            }),
            version: info.browser,
        })
    }

    /// Wraps an existing connection without owning a process.
    ///
    /// Used for already-running endpoints and by the fake-transport tests.
    pub fn attached(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            process: None,
            version: None,
        }
    }

    /// Browser product string from the endpoint, when known.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Opens a new page as a flat-protocol session.
    pub async fn new_page(&self) -> Result<Page> {
        let result = self
            .connection
            .send("Target.createTarget", json!({"url": "about:blank"}), None)
            .await?;
        let target_id = required_str(&result, "targetId", "Target.createTarget")?;

        let result = self
            .connection
            .send(
                "Target.attachToTarget",
                json!({"targetId": target_id, "flatten": true}),
                None,
            )
            .await?;
        let session_id = required_str(&result, "sessionId", "Target.attachToTarget")?;

        // Subscribe before enabling events so nothing is dropped.
        let page = Page::attach(Arc::clone(&self.connection), session_id, target_id);
        page.enable().await?;
        Ok(page)
    }

    /// Closes the browser and waits for the process to exit.
    ///
    /// The process guard still kills a lingering child if the orderly
    /// shutdown stalls.
    pub async fn close(mut self) -> Result<()> {
        let outcome = match self.connection.send("Browser.close", json!({}), None).await {
            // The browser may tear the connection down before replying.
            Ok(_) | Err(Error::ChannelClosed) => Ok(()),
            Err(e) => Err(e),
        };

        if let Some(mut guard) = self.process.take() {
            for _ in 0..20 {
                if let Ok(Some(_)) = guard.child.try_wait() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            drop(guard);
        }

        outcome
    }
}

fn required_str(result: &Value, field: &str, method: &str) -> Result<String> {
    result
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Protocol(format!("{method} returned no {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_options_default_to_headless_auto_discovery() {
        let options = LaunchOptions::default();
        assert!(options.headless.is_none());
        assert!(options.executable.is_none());
        assert!(options.remote_debugging_port.is_none());
    }

    #[test]
    fn required_str_reports_missing_field() {
        let result = json!({"unexpected": true});
        let error = required_str(&result, "targetId", "Target.createTarget").unwrap_err();
        assert!(error.to_string().contains("Target.createTarget"));
        assert!(error.to_string().contains("targetId"));
    }
}
