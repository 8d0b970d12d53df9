//! Timeout and resolver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::strings;

/// Wait budgets, all in milliseconds. Every wait in the engine is a bounded
/// poll against one of these ceilings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_structural_ms")]
    pub structural_ms: u64,

    #[serde(default = "default_exact_ms")]
    pub exact_ms: u64,

    #[serde(default = "default_contains_ms")]
    pub contains_ms: u64,

    #[serde(default = "default_text_walk_ms")]
    pub text_walk_ms: u64,

    /// Wait for a panel container after clicking its input.
    #[serde(default = "default_panel_open_ms")]
    pub panel_open_ms: u64,

    /// Ceiling for the next panel's marker after a selection.
    #[serde(default = "default_marker_wait_ms")]
    pub marker_wait_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-strategy budget when probing calibration indicators.
    #[serde(default = "default_indicator_probe_ms")]
    pub indicator_probe_ms: u64,

    #[serde(default = "default_detection_attempts")]
    pub detection_attempts: u32,

    #[serde(default = "default_detection_pause_ms")]
    pub detection_pause_ms: u64,

    /// Pause after dismissing a dropdown.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl TimeoutConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn panel_open(&self) -> Duration {
        Duration::from_millis(self.panel_open_ms)
    }

    pub fn marker_wait(&self) -> Duration {
        Duration::from_millis(self.marker_wait_ms)
    }

    pub fn indicator_probe(&self) -> Duration {
        Duration::from_millis(self.indicator_probe_ms)
    }

    pub fn detection_pause(&self) -> Duration {
        Duration::from_millis(self.detection_pause_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            structural_ms: default_structural_ms(),
            exact_ms: default_exact_ms(),
            contains_ms: default_contains_ms(),
            text_walk_ms: default_text_walk_ms(),
            panel_open_ms: default_panel_open_ms(),
            marker_wait_ms: default_marker_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            indicator_probe_ms: default_indicator_probe_ms(),
            detection_attempts: default_detection_attempts(),
            detection_pause_ms: default_detection_pause_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_structural_ms() -> u64 {
    2000
}

fn default_exact_ms() -> u64 {
    1000
}

fn default_contains_ms() -> u64 {
    1000
}

fn default_text_walk_ms() -> u64 {
    500
}

fn default_panel_open_ms() -> u64 {
    1500
}

fn default_marker_wait_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_indicator_probe_ms() -> u64 {
    500
}

fn default_detection_attempts() -> u32 {
    3
}

fn default_detection_pause_ms() -> u64 {
    1000
}

fn default_settle_ms() -> u64 {
    300
}

/// Candidate selectors used by the document-wide resolution strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Elements considered by the exact-text and contains strategies.
    #[serde(default = "default_candidate_selectors")]
    pub candidate_selectors: Vec<String>,

    /// Maximum text length of a candidate for the contains strategy.
    #[serde(default = "default_max_contains_len")]
    pub max_contains_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidate_selectors: default_candidate_selectors(),
            max_contains_len: default_max_contains_len(),
        }
    }
}

fn default_candidate_selectors() -> Vec<String> {
    strings(&["li", "td", "a", "span", "div", "h2", "h3", "button", "label"])
}

fn default_max_contains_len() -> usize {
    120
}
