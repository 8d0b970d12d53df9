//! Browser capability consumed by the engine.
//!
//! The engine never assumes a particular automation product. It needs a page
//! that can be opened, queried, clicked and screenshotted, and a context that
//! hands out fresh pages.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::DriverError;

/// Rendered bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Snapshot of an element taken when it was queried.
///
/// `id` is an opaque driver reference used to address the same node again
/// for clicks and screenshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    /// Lower-case tag name.
    pub tag: String,
    /// Trimmed text content.
    pub text: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    pub bounds: Rect,
    /// False when the element or an ancestor is `display:none` / detached
    /// from layout.
    pub displayed: bool,
}

impl ElementHandle {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Rendered with a non-zero size and not hidden.
    pub fn is_visible(&self) -> bool {
        self.displayed && !self.bounds.is_empty()
    }
}

/// A single browser page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the document to load.
    async fn open(&self, url: &str) -> Result<(), DriverError>;

    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError>;

    /// Parent elements of every non-empty text node, in document order.
    async fn text_node_parents(&self) -> Result<Vec<ElementHandle>, DriverError>;

    /// Click an element previously returned by this page.
    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Press a named key (`Escape`, `Enter`).
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;

    /// PNG screenshot of an element, or of the viewport when `None`.
    async fn screenshot(&self, element: Option<&ElementHandle>) -> Result<Vec<u8>, DriverError>;

    /// Serialized HTML of the document.
    async fn content(&self) -> Result<String, DriverError>;

    /// Rendered text of the document body.
    async fn body_text(&self) -> Result<String, DriverError>;

    /// Evaluate a script expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, DriverError>;

    /// Close the page. Further calls fail with [`DriverError::Closed`].
    async fn close(&self) -> Result<(), DriverError>;

    /// Poll until a visible element matches `selector` or `timeout` elapses.
    async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = self
                .query_all(selector)
                .await?
                .into_iter()
                .find(ElementHandle::is_visible)
            {
                return Ok(Some(found));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll).await;
        }
    }
}

/// An isolated browser context (own cookies and storage).
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// Open a fresh blank page inside this context.
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError>;

    /// Dispose of the context and every page it owns.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Source of isolated browser contexts.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn open_context(&self, label: &str) -> Result<Box<dyn BrowserContext>, DriverError>;
}
