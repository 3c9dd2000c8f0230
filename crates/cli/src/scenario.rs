//! The fixed gallery verification sequence.
//!
//! Drives the page under test through its three visual milestones - the
//! gallery grid, the viewer modal with its rendered model, and the photo
//! lightbox - capturing a screenshot at each one. Every capture happens
//! only after its preconditions are confirmed in the live page.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use tracing::info;
use vv::{Browser, LaunchOptions, Page, ScreenshotOptions, expect};

use crate::cli::Cli;
use crate::error::{Result, RunnerError};

/// Gallery entries on the main page.
const CARD: &str = ".card";
/// The 3D-model viewer modal.
const VIEWER_MODAL: &str = "#viewer-modal";
/// Drawing surface that appears once the model has rendered.
const VIEWER_CANVAS: &str = "#viewer-container canvas";
/// Photo thumbnails inside the open modal.
const MODAL_GALLERY_IMAGE: &str = "#modal-gallery-container img";
/// Lightbox overlay, identified by its stacking order while open.
const LIGHTBOX: &str = r#".modal[style*="z-index: 1001"]"#;

pub const MAIN_PAGE_SHOT: &str = "01_main_page.png";
pub const MODAL_SHOT: &str = "02_modal.png";
pub const LIGHTBOX_SHOT: &str = "03_lightbox.png";

/// Runs the full verification sequence.
///
/// The browser is released on every exit path: the drive outcome is
/// captured first and `close()` always runs.
pub async fn run(cli: &Cli) -> Result<()> {
    std::fs::create_dir_all(&cli.out_dir)?;

    if let Some(executable) = &cli.executable {
        if !executable.exists() {
            return Err(RunnerError::Context(format!(
                "browser executable not found: {}",
                executable.display()
            )));
        }
    }

    let browser = Browser::launch(LaunchOptions {
        headless: Some(!cli.headed),
        executable: cli.executable.clone(),
        ..Default::default()
    })
    .await?;

    let outcome = drive(&browser, cli).await;
    let closed = browser.close().await;

    outcome?;
    closed?;

    println!("{}", "verification complete".green().bold());
    Ok(())
}

async fn drive(browser: &Browser, cli: &Cli) -> Result<()> {
    let page = browser.new_page().await?;
    page.set_default_timeout(Duration::from_millis(cli.timeout_ms));

    // Echo every in-page console message, in emission order.
    page.on_console(|message| println!("Browser console: {}", message.text()));

    info!(target = "vv", url = %cli.url, "navigating");
    page.goto(&cli.url).await?;

    page.wait_for_selector(CARD).await?;
    capture(
        &page,
        &cli.out_dir,
        MAIN_PAGE_SHOT,
        ScreenshotOptions { full_page: true },
    )
    .await?;

    page.locator(CARD).first().click().await?;
    expect(page.locator(VIEWER_MODAL)).to_be_visible().await?;
    page.wait_for_selector(VIEWER_CANVAS).await?;
    page.wait_for_selector(MODAL_GALLERY_IMAGE).await?;
    capture(&page, &cli.out_dir, MODAL_SHOT, ScreenshotOptions::default()).await?;

    page.locator(MODAL_GALLERY_IMAGE).first().click().await?;
    expect(page.locator(LIGHTBOX)).to_be_visible().await?;
    capture(
        &page,
        &cli.out_dir,
        LIGHTBOX_SHOT,
        ScreenshotOptions::default(),
    )
    .await?;

    Ok(())
}

async fn capture(
    page: &Page,
    out_dir: &Path,
    file: &str,
    options: ScreenshotOptions,
) -> Result<()> {
    let path = out_dir.join(file);
    page.screenshot_to_file(&path, options).await?;
    info!(target = "vv", path = %path.display(), "screenshot saved");
    println!("{} {}", "✓".green(), file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_names_are_unique_and_ordered() {
        let shots = [MAIN_PAGE_SHOT, MODAL_SHOT, LIGHTBOX_SHOT];
        let mut sorted = shots;
        sorted.sort_unstable();
        assert_eq!(shots, sorted);
        assert!(shots.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn lightbox_selector_matches_on_stacking_order() {
        assert!(LIGHTBOX.contains("z-index: 1001"));
        assert!(LIGHTBOX.starts_with(".modal"));
    }

    #[test]
    fn modal_selectors_are_scoped_to_their_containers() {
        assert!(VIEWER_CANVAS.starts_with("#viewer-container"));
        assert!(MODAL_GALLERY_IMAGE.starts_with("#modal-gallery-container"));
    }
}
