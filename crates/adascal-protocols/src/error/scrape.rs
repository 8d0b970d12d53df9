//! Engine error taxonomy.
//!
//! Every variant maps to a containment level in the orchestrator:
//! transition failures skip a combination, extraction failures leave a slot
//! at `N/A`, OCR failures only degrade target-code extraction, persistence
//! failures are retried on the next save and configuration errors skip a
//! manufacturer.

use thiserror::Error;

use super::{DriverError, OcrError};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Transition failed in state {state} selecting '{target}': {reason}")]
    TransitionFailure {
        state: String,
        target: String,
        reason: String,
    },

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("OCR failed: {0}")]
    OcrFailure(#[from] OcrError),

    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Browser error: {0}")]
    Driver(#[from] DriverError),
}

impl ScrapeError {
    /// Build a transition failure.
    pub fn transition(
        state: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TransitionFailure {
            state: state.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable category, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransitionFailure { .. } => "transition_failure",
            Self::ExtractionFailure(_) => "extraction_failure",
            Self::OcrFailure(_) => "ocr_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::ConfigurationError(_) => "configuration_error",
            Self::Driver(_) => "driver_error",
        }
    }
}
