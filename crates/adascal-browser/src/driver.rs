//! [`PageDriver`] and [`BrowserContext`] over CDP.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use adascal_protocols::{BrowserContext, BrowserProvider, DriverError, ElementHandle, PageDriver};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cdp::{CdpClient, PageSession, ScreenshotFormat, Viewport};

/// Hands out one isolated browser context per label.
pub struct CdpBrowserProvider {
    client: Arc<CdpClient>,
    viewport: (u32, u32),
    page_load: Duration,
}

impl CdpBrowserProvider {
    pub fn new(client: Arc<CdpClient>, width: u32, height: u32, page_load: Duration) -> Self {
        Self {
            client,
            viewport: (width, height),
            page_load,
        }
    }
}

#[async_trait]
impl BrowserProvider for CdpBrowserProvider {
    async fn open_context(&self, label: &str) -> Result<Box<dyn BrowserContext>, DriverError> {
        let context_id = self.client.create_browser_context().await?;
        debug!("Opened browser context {} for {}", context_id, label);
        Ok(Box::new(CdpBrowserContext {
            client: self.client.clone(),
            context_id,
            viewport: self.viewport,
            page_load: self.page_load,
        }))
    }
}

/// A CDP browser context. Pages share its cookies and storage only.
pub struct CdpBrowserContext {
    client: Arc<CdpClient>,
    context_id: String,
    viewport: (u32, u32),
    page_load: Duration,
}

impl CdpBrowserContext {
    pub fn context_id(&self) -> &str {
        &self.context_id
    }
}

#[async_trait]
impl BrowserContext for CdpBrowserContext {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let session = self.client.new_page_in_context(&self.context_id).await?;
        session.set_viewport(self.viewport.0, self.viewport.1).await?;
        Ok(Box::new(CdpPageDriver::new(
            session,
            self.client.clone(),
            self.page_load,
        )))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.client.dispose_browser_context(&self.context_id).await?;
        Ok(())
    }
}

/// A single page attached over CDP.
pub struct CdpPageDriver {
    session: PageSession,
    client: Arc<CdpClient>,
    closed: AtomicBool,
    page_load: Duration,
}

impl CdpPageDriver {
    pub fn new(session: PageSession, client: Arc<CdpClient>, page_load: Duration) -> Self {
        Self {
            session,
            client,
            closed: AtomicBool::new(false),
            page_load,
        }
    }

    fn ensure_open(&self) -> Result<&PageSession, DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }
        Ok(&self.session)
    }
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    async fn open(&self, url: &str) -> Result<(), DriverError> {
        self.ensure_open()?.navigate(url, self.page_load).await?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        Ok(self.ensure_open()?.query_elements(selector).await?)
    }

    async fn text_node_parents(&self) -> Result<Vec<ElementHandle>, DriverError> {
        Ok(self.ensure_open()?.text_node_parents().await?)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let session = self.ensure_open()?;
        let located = session.locate(&element.id, true).await?;
        let rect = located.viewport_rect();
        if rect.is_empty() {
            // Zero-size nodes (e.g. wrapped labels) cannot take a mouse event.
            session.dom_click(&element.id).await?;
        } else {
            let (x, y) = rect.center();
            session.click(x, y).await?;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.ensure_open()?.press_key(key).await?;
        Ok(())
    }

    async fn screenshot(&self, element: Option<&ElementHandle>) -> Result<Vec<u8>, DriverError> {
        let session = self.ensure_open()?;
        let clip = match element {
            Some(element) => {
                let rect = session.locate(&element.id, true).await?.document_rect();
                if rect.is_empty() {
                    return Err(DriverError::Screenshot(format!(
                        "element {} has no rendered size",
                        element.id
                    )));
                }
                Some(Viewport {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    scale: 1.0,
                })
            }
            None => None,
        };
        session
            .screenshot(ScreenshotFormat::Png, clip)
            .await
            .map_err(|e| DriverError::Screenshot(e.to_string()))
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(self.ensure_open()?.get_content().await?)
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let value = self
            .ensure_open()?
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        Ok(self.ensure_open()?.evaluate(script).await?)
    }

    async fn close(&self) -> Result<(), DriverError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.client.close_page(self.session.target_id()).await {
            warn!("Failed to close page {}: {}", self.session.target_id(), e);
        }
        Ok(())
    }
}
