//! Calibration extractor and OCR configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{default_true, strings};

/// Indicators and containers the extractor looks at on the result panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Explicit labels naming both procedures, tried first.
    #[serde(default = "default_combined_labels")]
    pub combined_labels: Vec<String>,

    #[serde(default = "default_static_label")]
    pub static_label: String,

    #[serde(default = "default_dynamic_label")]
    pub dynamic_label: String,

    /// Elements that may carry an indicator label.
    #[serde(default = "default_indicator_selectors")]
    pub indicator_selectors: Vec<String>,

    /// Longest element text still treated as a single combined indicator.
    #[serde(default = "default_combined_max_len")]
    pub combined_max_len: usize,

    /// Calibration diagram containers (presence alone implies static).
    #[serde(default = "default_diagram_selectors")]
    pub diagram_selectors: Vec<String>,

    /// Containers whose text may carry a target code even when hidden.
    #[serde(default = "default_code_containers")]
    pub code_containers: Vec<String>,

    #[serde(default = "default_code_pattern")]
    pub code_pattern: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            combined_labels: default_combined_labels(),
            static_label: default_static_label(),
            dynamic_label: default_dynamic_label(),
            indicator_selectors: default_indicator_selectors(),
            combined_max_len: default_combined_max_len(),
            diagram_selectors: default_diagram_selectors(),
            code_containers: default_code_containers(),
            code_pattern: default_code_pattern(),
        }
    }
}

fn default_combined_labels() -> Vec<String> {
    strings(&[
        "Static Calibration+Dynamic Calibration",
        "Static Calibration + Dynamic Calibration",
        "Static+Dynamic",
    ])
}

fn default_static_label() -> String {
    "Static Calibration".to_string()
}

fn default_dynamic_label() -> String {
    "Dynamic Calibration".to_string()
}

fn default_indicator_selectors() -> Vec<String> {
    strings(&["div", "h2", "h3", "span", "p", "li"])
}

fn default_combined_max_len() -> usize {
    80
}

fn default_diagram_selectors() -> Vec<String> {
    strings(&[".swiper-slide", ".calibration-container", ".calibration-image"])
}

fn default_code_containers() -> Vec<String> {
    strings(&[".swiper-slide", ".calibration-info", ".csc-code"])
}

fn default_code_pattern() -> String {
    r"(AUTEL-)?CSC\d{4}(/\d+)*".to_string()
}

/// Tesseract invocation and image candidate filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Extra arguments passed after the language.
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,

    #[serde(default = "default_ocr_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_min_size")]
    pub min_width: u32,

    #[serde(default = "default_min_size")]
    pub min_height: u32,

    /// Image sources must contain one of these (case-insensitive).
    #[serde(default = "default_asset_patterns")]
    pub asset_patterns: Vec<String>,

    /// Images narrower than this are upscaled before recognition.
    #[serde(default = "default_upscale_below")]
    pub upscale_below: u32,

    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: u32,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_command(),
            language: default_language(),
            extra_args: default_extra_args(),
            timeout_ms: default_ocr_timeout_ms(),
            min_width: default_min_size(),
            min_height: default_min_size(),
            asset_patterns: default_asset_patterns(),
            upscale_below: default_upscale_below(),
            upscale_factor: default_upscale_factor(),
        }
    }
}

fn default_command() -> String {
    "tesseract".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_extra_args() -> Vec<String> {
    strings(&["--psm", "6"])
}

fn default_ocr_timeout_ms() -> u64 {
    15000
}

fn default_min_size() -> u32 {
    50
}

fn default_asset_patterns() -> Vec<String> {
    strings(&["calibration", "adas", "csc", "download1.auteltech.net"])
}

fn default_upscale_below() -> u32 {
    600
}

fn default_upscale_factor() -> u32 {
    2
}
