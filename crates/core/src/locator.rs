//! Locator - selector-addressed element handle.
//!
//! A locator holds a CSS selector, not an element reference: every
//! operation re-resolves the selector in the live document, so a locator
//! created before its element exists is fine.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::page::{Page, js_quote};

/// Selector-addressed handle to one element of a page.
#[derive(Clone)]
pub struct Locator {
    page: Page,
    selector: String,
    index: usize,
}

impl Locator {
    pub(crate) fn new(page: Page, selector: &str) -> Self {
        Self {
            page,
            selector: selector.to_string(),
            index: 0,
        }
    }

    /// The selector this locator resolves.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Explicitly targets the first match.
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Targets the zero-based `index`-th match.
    pub fn nth(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Number of elements currently matching the selector.
    pub async fn count(&self) -> Result<u64> {
        let expression = format!(
            "document.querySelectorAll({}).length",
            js_quote(&self.selector)
        );
        Ok(self
            .page
            .evaluate(&expression)
            .await?
            .as_u64()
            .unwrap_or(0))
    }

    /// Whether the targeted element exists and is rendered visible.
    pub async fn is_visible(&self) -> Result<bool> {
        let expression = format!(
            r#"(() => {{
                const el = document.querySelectorAll({selector})[{index}];
                if (!el) return false;
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden') return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 && rect.height > 0;
            }})()"#,
            selector = js_quote(&self.selector),
            index = self.index,
        );
        Ok(self.page.evaluate(&expression).await? == Value::Bool(true))
    }

    /// Scrolls the element into view and dispatches a pointer click at its
    /// center.
    pub async fn click(&self) -> Result<()> {
        let expression = format!(
            r#"(() => {{
                const el = document.querySelectorAll({selector})[{index}];
                if (!el) return null;
                el.scrollIntoView({{block: 'center', inline: 'center'}});
                const rect = el.getBoundingClientRect();
                return {{x: rect.x + rect.width / 2, y: rect.y + rect.height / 2}};
            }})()"#,
            selector = js_quote(&self.selector),
            index = self.index,
        );

        let point = self.page.evaluate(&expression).await?;
        let (x, y) = match (
            point.pointer("/x").and_then(Value::as_f64),
            point.pointer("/y").and_then(Value::as_f64),
        ) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(Error::ElementNotFound(self.selector.clone())),
        };

        self.page.dispatch_mouse_click(x, y).await
    }
}
