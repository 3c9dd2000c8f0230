//! Page behavior over the fake transport.
//!
//! Scripts the browser side of the protocol and checks what the page
//! actually puts on the wire, without launching anything.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use vv::{
    Browser, Connection, Error, FakeTransportBuilder, FakeTransportController, Page,
    ScreenshotOptions, expect,
};

async fn attach_page() -> (Page, FakeTransportController) {
    let (parts, controller) = FakeTransportBuilder::new().build();
    let connection = Arc::new(Connection::new(parts));

    let conn = Arc::clone(&connection);
    tokio::spawn(async move {
        conn.run().await;
    });

    let page = Page::attach(connection, "session-1".to_string(), "target-1".to_string());
    (page, controller)
}

/// Answers every sent command via `reply(method, params)` and records the
/// commands in `log`.
fn spawn_responder<F>(
    controller: FakeTransportController,
    log: Arc<StdMutex<Vec<Value>>>,
    reply: F,
) where
    F: Fn(&str, &Value) -> Value + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            for message in controller.take_sent().await {
                log.lock().unwrap().push(message.clone());
                let id = message["id"].as_u64().unwrap() as u32;
                let method = message["method"].as_str().unwrap_or_default();
                let result = reply(method, &message["params"]);
                controller.inject_response(id, result);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    });
}

fn methods(log: &Arc<StdMutex<Vec<Value>>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|m| m["method"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn wait_for_selector_polls_until_present() {
    let (page, controller) = attach_page().await;
    let log = Arc::new(StdMutex::new(Vec::new()));
    let polls = Arc::new(AtomicUsize::new(0));

    let poll_counter = Arc::clone(&polls);
    spawn_responder(controller, Arc::clone(&log), move |method, _params| {
        match method {
            "Runtime.evaluate" => {
                // Absent twice, then present.
                let n = poll_counter.fetch_add(1, Ordering::SeqCst);
                json!({"result": {"type": "boolean", "value": n >= 2}})
            }
            _ => json!({}),
        }
    });

    page.wait_for_selector(".card").await.unwrap();
    assert!(polls.load(Ordering::SeqCst) >= 3);

    let sent = methods(&log);
    assert!(sent.iter().all(|m| m == "Runtime.evaluate"));
    let query = log.lock().unwrap()[0]["params"]["expression"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(query.contains("querySelector"));
    assert!(query.contains(".card"));
}

#[tokio::test]
async fn wait_for_selector_times_out_with_selector_named() {
    let (page, controller) = attach_page().await;
    page.set_default_timeout(Duration::from_millis(300));

    spawn_responder(
        controller,
        Arc::new(StdMutex::new(Vec::new())),
        |method, _| match method {
            "Runtime.evaluate" => json!({"result": {"type": "boolean", "value": false}}),
            _ => json!({}),
        },
    );

    let error = page.wait_for_selector("#viewer-modal").await.unwrap_err();
    assert!(error.is_timeout());
    assert!(error.to_string().contains("#viewer-modal"));
}

#[tokio::test]
async fn goto_completes_once_document_is_loaded() {
    let (page, controller) = attach_page().await;
    let log = Arc::new(StdMutex::new(Vec::new()));

    spawn_responder(controller, Arc::clone(&log), |method, _| match method {
        "Page.navigate" => json!({"frameId": "F1"}),
        "Runtime.evaluate" => json!({"result": {"type": "string", "value": "complete"}}),
        _ => json!({}),
    });

    page.goto("http://localhost:8000").await.unwrap();

    let sent = methods(&log);
    assert_eq!(sent[0], "Page.navigate");
    assert!(sent[1..].iter().any(|m| m == "Runtime.evaluate"));
    let log = log.lock().unwrap();
    let navigate = &log[0];
    assert_eq!(navigate["params"]["url"], "http://localhost:8000");
    assert_eq!(navigate["sessionId"], "session-1");
}

#[tokio::test]
async fn goto_surfaces_navigation_error_text() {
    let (page, controller) = attach_page().await;

    spawn_responder(
        controller,
        Arc::new(StdMutex::new(Vec::new())),
        |method, _| match method {
            "Page.navigate" => {
                json!({"frameId": "F1", "errorText": "net::ERR_CONNECTION_REFUSED"})
            }
            _ => json!({}),
        },
    );

    let error = page.goto("http://localhost:8000").await.unwrap_err();
    match error {
        Error::Navigation { url, message } => {
            assert_eq!(url, "http://localhost:8000");
            assert!(message.contains("ERR_CONNECTION_REFUSED"));
        }
        other => panic!("Expected Navigation error, got {other:?}"),
    }
}

#[tokio::test]
async fn console_hooks_observe_messages_in_emission_order() {
    let (page, controller) = attach_page().await;

    let seen: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    page.on_console(move |message| {
        sink.lock()
            .unwrap()
            .push(format!("{}:{}", message.kind(), message.text()));
    });

    for (kind, text) in [("log", "gallery ready"), ("warning", "slow asset"), ("log", "model loaded")] {
        controller.inject_event(
            "session-1",
            "Runtime.consoleAPICalled",
            json!({"type": kind, "args": [{"type": "string", "value": text}]}),
        );
    }
    // An event for another session must not reach this page's hooks.
    controller.inject_event(
        "session-2",
        "Runtime.consoleAPICalled",
        json!({"type": "log", "args": [{"type": "string", "value": "other page"}]}),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            "log:gallery ready".to_string(),
            "warning:slow asset".to_string(),
            "log:model loaded".to_string(),
        ]
    );
}

#[tokio::test]
async fn click_resolves_center_then_dispatches_pointer_events() {
    let (page, controller) = attach_page().await;
    let log = Arc::new(StdMutex::new(Vec::new()));

    spawn_responder(controller, Arc::clone(&log), |method, _| match method {
        "Runtime.evaluate" => {
            json!({"result": {"type": "object", "value": {"x": 40.0, "y": 60.0}}})
        }
        "Input.dispatchMouseEvent" => json!({}),
        _ => json!({}),
    });

    page.locator(".card").first().click().await.unwrap();

    let sent = methods(&log);
    assert_eq!(
        sent,
        vec![
            "Runtime.evaluate",
            "Input.dispatchMouseEvent",
            "Input.dispatchMouseEvent",
            "Input.dispatchMouseEvent",
        ]
    );

    let log = log.lock().unwrap();
    assert_eq!(log[1]["params"]["type"], "mouseMoved");
    assert_eq!(log[2]["params"]["type"], "mousePressed");
    assert_eq!(log[3]["params"]["type"], "mouseReleased");
    for event in &log[2..4] {
        assert_eq!(event["params"]["x"], 40.0);
        assert_eq!(event["params"]["y"], 60.0);
        assert_eq!(event["params"]["button"], "left");
        assert_eq!(event["params"]["clickCount"], 1);
    }
}

#[tokio::test]
async fn click_fails_when_no_element_matches() {
    let (page, controller) = attach_page().await;

    spawn_responder(
        controller,
        Arc::new(StdMutex::new(Vec::new())),
        |method, _| match method {
            "Runtime.evaluate" => json!({"result": {"type": "object", "value": null}}),
            _ => json!({}),
        },
    );

    let error = page.locator(".missing").click().await.unwrap_err();
    match error {
        Error::ElementNotFound(selector) => assert_eq!(selector, ".missing"),
        other => panic!("Expected ElementNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn full_page_screenshot_clips_to_layout_metrics_and_overwrites() {
    let (page, controller) = attach_page().await;
    let log = Arc::new(StdMutex::new(Vec::new()));

    // "iVBORw0KGgo=" is the base64 PNG signature.
    spawn_responder(controller, Arc::clone(&log), |method, _| match method {
        "Page.getLayoutMetrics" => {
            json!({"cssContentSize": {"x": 0, "y": 0, "width": 1280, "height": 2400}})
        }
        "Page.captureScreenshot" => json!({"data": "iVBORw0KGgo="}),
        _ => json!({}),
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("01_main_page.png");
    std::fs::write(&path, b"stale capture from a previous run").unwrap();

    page.screenshot_to_file(&path, ScreenshotOptions { full_page: true })
        .await
        .unwrap();

    let sent = methods(&log);
    assert_eq!(sent, vec!["Page.getLayoutMetrics", "Page.captureScreenshot"]);

    let log_entries = log.lock().unwrap();
    let capture = &log_entries[1];
    assert_eq!(capture["params"]["format"], "png");
    assert_eq!(capture["params"]["clip"]["width"], 1280);
    assert_eq!(capture["params"]["clip"]["height"], 2400);
    assert_eq!(capture["params"]["captureBeyondViewport"], true);

    let written = std::fs::read(&path).unwrap();
    assert_eq!(&written[..4], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn viewport_screenshot_skips_layout_metrics() {
    let (page, controller) = attach_page().await;
    let log = Arc::new(StdMutex::new(Vec::new()));

    spawn_responder(controller, Arc::clone(&log), |method, _| match method {
        "Page.captureScreenshot" => json!({"data": "iVBORw0KGgo="}),
        _ => json!({}),
    });

    let bytes = page.screenshot(ScreenshotOptions::default()).await.unwrap();
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

    let sent = methods(&log);
    assert_eq!(sent, vec!["Page.captureScreenshot"]);
    assert!(log.lock().unwrap()[0]["params"].get("clip").is_none());
}

#[tokio::test]
async fn visibility_assertion_retries_until_visible() {
    let (page, controller) = attach_page().await;
    let polls = Arc::new(AtomicUsize::new(0));

    let poll_counter = Arc::clone(&polls);
    spawn_responder(
        controller,
        Arc::new(StdMutex::new(Vec::new())),
        move |method, _| match method {
            "Runtime.evaluate" => {
                let n = poll_counter.fetch_add(1, Ordering::SeqCst);
                json!({"result": {"type": "boolean", "value": n >= 2}})
            }
            _ => json!({}),
        },
    );

    expect(page.locator("#viewer-modal"))
        .with_poll_interval(Duration::from_millis(10))
        .to_be_visible()
        .await
        .unwrap();
    assert!(polls.load(Ordering::SeqCst) >= 3);
}

#[tokio::test]
async fn visibility_assertion_times_out_with_selector_named() {
    let (page, controller) = attach_page().await;

    spawn_responder(
        controller,
        Arc::new(StdMutex::new(Vec::new())),
        |method, _| match method {
            "Runtime.evaluate" => json!({"result": {"type": "boolean", "value": false}}),
            _ => json!({}),
        },
    );

    let error = expect(page.locator(r#".modal[style*="z-index: 1001"]"#))
        .with_timeout(Duration::from_millis(100))
        .with_poll_interval(Duration::from_millis(10))
        .to_be_visible()
        .await
        .unwrap_err();

    assert!(error.is_timeout());
    assert!(error.to_string().contains("z-index: 1001"));
}

#[tokio::test]
async fn attached_browser_opens_page_via_target_domain() {
    let (parts, controller) = FakeTransportBuilder::new().build();
    let connection = Arc::new(Connection::new(parts));

    let conn = Arc::clone(&connection);
    tokio::spawn(async move {
        conn.run().await;
    });

    let log = Arc::new(StdMutex::new(Vec::new()));
    spawn_responder(controller, Arc::clone(&log), |method, _| match method {
        "Target.createTarget" => json!({"targetId": "T1"}),
        "Target.attachToTarget" => json!({"sessionId": "S1"}),
        _ => json!({}),
    });

    let browser = Browser::attached(connection);
    let _page = browser.new_page().await.unwrap();

    let sent = methods(&log);
    assert_eq!(
        sent,
        vec!["Target.createTarget", "Target.attachToTarget", "Runtime.enable"]
    );

    let log = log.lock().unwrap();
    assert_eq!(log[0]["params"]["url"], "about:blank");
    assert_eq!(log[1]["params"]["flatten"], true);
    assert_eq!(log[2]["sessionId"], "S1");
}

#[tokio::test]
async fn evaluate_surfaces_page_exceptions() {
    let (page, controller) = attach_page().await;

    spawn_responder(
        controller,
        Arc::new(StdMutex::new(Vec::new())),
        |method, _| match method {
            "Runtime.evaluate" => json!({
                "result": {"type": "object", "subtype": "error"},
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": {"description": "ReferenceError: gallery is not defined"}
                }
            }),
            _ => json!({}),
        },
    );

    let error = page.evaluate("gallery.load()").await.unwrap_err();
    match error {
        Error::JsException(text) => assert!(text.contains("ReferenceError")),
        other => panic!("Expected JsException, got {other:?}"),
    }
}
