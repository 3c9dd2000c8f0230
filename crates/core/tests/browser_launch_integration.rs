// Integration tests for Browser::launch().
//
// These verify the full launch -> navigate -> capture -> close cycle
// against a real Chromium. Ignored by default: run with
// `cargo test -- --ignored` on a machine with a Chromium install.

use vv::{Browser, LaunchOptions, ScreenshotOptions};

#[tokio::test]
#[ignore = "requires a local Chromium install"]
async fn launch_navigate_capture_close() {
    let browser = Browser::launch(LaunchOptions::default())
        .await
        .expect("Failed to launch browser");
    assert!(browser.version().is_some());

    let page = browser.new_page().await.expect("Failed to open page");

    page.goto("data:text/html,<div class=card>card</div>")
        .await
        .expect("Failed to navigate");
    page.wait_for_selector(".card")
        .await
        .expect("Card never appeared");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.png");
    page.screenshot_to_file(&path, ScreenshotOptions::default())
        .await
        .expect("Failed to capture screenshot");
    assert!(path.exists());

    browser.close().await.expect("Failed to close browser");
}
