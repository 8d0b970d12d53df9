//! Page driver errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element is no longer attached: {0}")]
    StaleElement(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Page closed")]
    Closed,

    #[error("Browser backend error: {0}")]
    Backend(String),
}
