//! Chromium discovery, launch, and debugging endpoint probing.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// `/json/version` response subset from the DevTools HTTP endpoint.
#[derive(Debug, Deserialize)]
pub struct CdpVersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
    #[serde(rename = "Browser")]
    pub browser: Option<String>,
}

/// Locates a Chromium-family executable on this machine.
pub fn find_chrome_executable() -> Option<String> {
    let candidates: Vec<String> = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    } else if cfg!(target_os = "windows") {
        windows_browser_candidates()
    } else {
        vec![
            "google-chrome-stable",
            "google-chrome",
            "chromium-browser",
            "chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    };

    for candidate in candidates {
        if candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':') {
            if Path::new(&candidate).exists() {
                return Some(candidate);
            }
        } else if which::which(&candidate).is_ok() {
            return Some(candidate);
        }
    }

    None
}

fn windows_browser_candidates() -> Vec<String> {
    let mut candidates = Vec::new();

    let mut roots = Vec::new();
    for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
        if let Ok(value) = std::env::var(key) {
            roots.push(PathBuf::from(value));
        }
    }
    if roots.is_empty() {
        roots.push(PathBuf::from(r"C:\Program Files"));
        roots.push(PathBuf::from(r"C:\Program Files (x86)"));
    }

    let suffixes: &[&[&str]] = &[
        &["Google", "Chrome", "Application", "chrome.exe"],
        &["Microsoft", "Edge", "Application", "msedge.exe"],
        &["Chromium", "Application", "chrome.exe"],
    ];

    for root in roots {
        for suffix in suffixes {
            let mut path = root.clone();
            for component in *suffix {
                path.push(component);
            }
            candidates.push(path.to_string_lossy().to_string());
        }
    }

    candidates.extend([
        "chrome.exe".to_string(),
        "msedge.exe".to_string(),
        "chromium.exe".to_string(),
    ]);

    candidates
}

/// Returns `true` when `port` can be bound on localhost.
pub fn port_available(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Picks a free port for the debugging endpoint, starting from the
/// conventional 9222.
pub fn pick_debug_port() -> Option<u16> {
    (9222..9322).find(|port| port_available(*port))
}

/// Resolves CDP version metadata from `/json/version` on `port`.
pub async fn fetch_cdp_endpoint(port: u16) -> Result<CdpVersionInfo> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(400))
        .build()
        .map_err(|e| Error::BrowserLaunch(format!("failed to create HTTP client: {e}")))?;
    let mut last_error = "no response".to_string();

    for url in [
        format!("http://127.0.0.1:{port}/json/version"),
        format!("http://localhost:{port}/json/version"),
    ] {
        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = e.to_string();
                continue;
            }
        };

        if !response.status().is_success() {
            last_error = format!("unexpected status {}", response.status());
            continue;
        }

        let info: CdpVersionInfo = response
            .json()
            .await
            .map_err(|e| Error::BrowserLaunch(format!("failed to parse CDP response: {e}")))?;
        return Ok(info);
    }

    Err(Error::BrowserLaunch(format!(
        "failed to reach debugging endpoint on port {port}: {last_error}"
    )))
}

/// Spawns Chromium with remote debugging on `port` and waits until the
/// endpoint answers.
pub(crate) async fn launch_chromium(
    executable: &str,
    port: u16,
    headless: bool,
    user_data_dir: &Path,
) -> Result<(Child, CdpVersionInfo)> {
    let mut args = vec![
        format!("--remote-debugging-port={port}"),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }

    let mut cmd = Command::new(executable);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::BrowserLaunch(format!("failed to launch {executable}: {e}")))?;

    let max_attempts = 25;
    let mut last_error = "endpoint not reachable".to_string();
    for _ in 0..max_attempts {
        tokio::time::sleep(Duration::from_millis(200)).await;

        if let Ok(Some(status)) = child.try_wait() {
            return Err(Error::BrowserLaunch(format!(
                "browser exited before the debugging endpoint became available (status: {status})"
            )));
        }

        match fetch_cdp_endpoint(port).await {
            Ok(info) => return Ok((child, info)),
            Err(e) => {
                last_error = e.to_string();
                continue;
            }
        }
    }

    let _ = child.kill();
    let _ = child.wait();
    Err(Error::BrowserLaunch(format!(
        "browser launched but debugging endpoint never came up on port {port}: {last_error}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_port_is_reported_unavailable() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(!port_available(port));
        drop(listener);
        assert!(port_available(port));
    }

    #[test]
    fn windows_candidates_include_common_commands() {
        let candidates = windows_browser_candidates();
        assert!(candidates.contains(&"chrome.exe".to_string()));
        assert!(candidates.contains(&"msedge.exe".to_string()));
    }

    #[test]
    fn version_info_parses_devtools_shape() {
        let info: CdpVersionInfo = serde_json::from_str(
            r#"{
                "Browser": "Chrome/126.0.6478.126",
                "Protocol-Version": "1.3",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"
            }"#,
        )
        .unwrap();
        assert_eq!(
            info.web_socket_debugger_url,
            "ws://127.0.0.1:9222/devtools/browser/abc"
        );
        assert_eq!(info.browser.as_deref(), Some("Chrome/126.0.6478.126"));
    }

    #[tokio::test]
    async fn probe_fails_cleanly_on_dead_port() {
        // Bind then drop to get a port that is almost certainly closed.
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = fetch_cdp_endpoint(port).await;
        assert!(matches!(result.unwrap_err(), Error::BrowserLaunch(_)));
    }
}
