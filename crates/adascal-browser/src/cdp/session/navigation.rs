//! Navigation.

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use tracing::debug;

use crate::cdp::error::CdpError;

use super::core::PageSession;

const LOAD_POLL: Duration = Duration::from_millis(100);

impl PageSession {
    /// Navigate and wait until the document is at least interactive.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;

        if let Some(error) = result.get("errorText").and_then(|e| e.as_str()) {
            return Err(CdpError::NavigationFailed(format!("{}: {}", url, error)));
        }

        self.wait_for_load(timeout).await?;

        debug!("Navigated to {}", url);
        Ok(())
    }

    /// Poll `document.readyState` until it is interactive or complete.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let deadline = Instant::now() + timeout;

        loop {
            let result = self.evaluate("document.readyState").await?;

            if matches!(result.as_str(), Some("complete" | "interactive")) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(CdpError::Timeout("Page load timeout".to_string()));
            }

            tokio::time::sleep(LOAD_POLL).await;
        }
    }
}
