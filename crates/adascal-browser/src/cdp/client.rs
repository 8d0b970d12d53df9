//! CDP browser-level client.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use super::error::CdpError;
use super::protocol::{BrowserVersion, TargetInfo};
use super::session::PageSession;
use super::transport::Transport;

/// CDP client connected to the browser endpoint.
pub struct CdpClient {
    /// HTTP endpoint for discovery.
    http_endpoint: String,
    /// Browser WebSocket URL.
    browser_ws_url: String,
    transport: Arc<Transport>,
}

impl CdpClient {
    /// Fetch `/json/version` from a debugging endpoint.
    pub async fn version(endpoint: &str) -> Result<BrowserVersion, CdpError> {
        let version_url = format!("{}/json/version", endpoint.trim_end_matches('/'));
        debug!("Fetching browser version from {}", version_url);

        reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))
    }

    /// Connect to Chrome at the given endpoint (e.g. `http://localhost:9222`).
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        let version = Self::version(&http_endpoint).await?;
        debug!("Connected to browser: {}", version.browser);

        let browser_ws_url = version.web_socket_debugger_url;
        let transport = Transport::open(&browser_ws_url).await?;

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            http_endpoint,
            browser_ws_url,
            transport,
        })
    }

    /// Send a browser-level command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport.call(method, params, None).await
    }

    pub fn http_endpoint(&self) -> &str {
        &self.http_endpoint
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Create an isolated browser context (separate cookies and storage).
    pub async fn create_browser_context(&self) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.createBrowserContext",
                Some(json!({"disposeOnDetach": true})),
            )
            .await?;

        let context_id = result["browserContextId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing browserContextId".to_string()))?
            .to_string();
        debug!("Created browser context {}", context_id);
        Ok(context_id)
    }

    /// Dispose of a browser context and every target inside it.
    pub async fn dispose_browser_context(&self, context_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.disposeBrowserContext",
            Some(json!({"browserContextId": context_id})),
        )
        .await?;
        debug!("Disposed browser context {}", context_id);
        Ok(())
    }

    /// Open a blank page inside a browser context and attach to it.
    pub async fn new_page_in_context(&self, context_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.createTarget",
                Some(json!({
                    "url": "about:blank",
                    "browserContextId": context_id,
                })),
            )
            .await?;

        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))?
            .to_string();
        debug!("Created page {} in context {}", target_id, context_id);

        self.attach_page(&target_id).await
    }

    /// Attach to an existing page target.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let session = PageSession::new(target_id.to_string(), session_id, self.transport.clone());
        session.enable_domains().await?;
        Ok(session)
    }

    /// All targets known to the browser.
    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        let targets: Vec<TargetInfo> = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets)
    }

    /// Close a page target.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
