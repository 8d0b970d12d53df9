//! Browser manager configuration and errors.

use std::path::PathBuf;
use std::time::Duration;

use adascal_protocols::DriverError;
use thiserror::Error;

use crate::cdp::CdpError;

/// Browser manager errors.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Browser not connected")]
    NotConnected,

    #[error("Chrome not found. Install Google Chrome or set browser.chrome_path.")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Browser error: {0}")]
    Cdp(String),
}

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(msg) => BrowserError::ConnectionFailed(msg),
            CdpError::ChromeNotAvailable(msg) => BrowserError::ConnectionFailed(msg),
            CdpError::SessionClosed => BrowserError::NotConnected,
            other => BrowserError::Cdp(other.to_string()),
        }
    }
}

impl From<BrowserError> for DriverError {
    fn from(e: BrowserError) -> Self {
        DriverError::Backend(e.to_string())
    }
}

/// Browser configuration.
#[derive(Debug, Clone)]
pub struct BrowserManagerConfig {
    /// Chrome debugging port.
    pub debug_port: u16,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Profile directory for the launched browser.
    pub profile_dir: Option<PathBuf>,
    pub headless: bool,
    /// Explicit executable; searched for when `None`.
    pub chrome_path: Option<PathBuf>,
    /// Page load ceiling used by drivers.
    pub page_load: Duration,
}

impl Default for BrowserManagerConfig {
    fn default() -> Self {
        Self {
            debug_port: 9222,
            viewport_width: 1920,
            viewport_height: 1080,
            profile_dir: None,
            headless: true,
            chrome_path: None,
            page_load: Duration::from_secs(30),
        }
    }
}

impl BrowserManagerConfig {
    /// Get the profile directory, falling back to `~/.adascal/browser-profile`.
    pub fn get_profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".adascal")
                .join("browser-profile")
        })
    }

    /// Get the CDP endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}
