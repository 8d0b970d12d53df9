//! Paths, browser and run scheduling configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::default_true;
use crate::loader::ConfigLoader;

/// Where inputs and outputs live. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    #[serde(default = "default_debug_dir")]
    pub debug_dir: String,

    #[serde(default = "default_catalogue")]
    pub catalogue: String,

    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
}

impl PathsConfig {
    pub fn results_dir(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.results_dir))
    }

    pub fn debug_dir(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.debug_dir))
    }

    pub fn catalogue(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.catalogue))
    }

    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.logs_dir))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            debug_dir: default_debug_dir(),
            catalogue: default_catalogue(),
            logs_dir: default_logs_dir(),
        }
    }
}

fn default_results_dir() -> String {
    "results".to_string()
}

fn default_debug_dir() -> String {
    "debug_info".to_string()
}

fn default_catalogue() -> String {
    "config/manufacturers.json".to_string()
}

fn default_logs_dir() -> String {
    "logs".to_string()
}

/// Chrome connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chrome binary; searched in the usual locations when unset.
    #[serde(default)]
    pub chrome_path: Option<String>,

    /// Persistent profile directory.
    #[serde(default)]
    pub profile_dir: Option<String>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_page_load_ms")]
    pub page_load_ms: u64,
}

impl BrowserConfig {
    pub fn profile_dir(&self) -> PathBuf {
        match &self.profile_dir {
            Some(dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".adascal")
                .join("browser-profile"),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            headless: true,
            chrome_path: None,
            profile_dir: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            page_load_ms: default_page_load_ms(),
        }
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_viewport_width() -> u32 {
    1366
}

fn default_viewport_height() -> u32 {
    900
}

fn default_page_load_ms() -> u64 {
    30000
}

/// Which manufacturers run and how many at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Canonical names to process; empty means the whole catalogue.
    #[serde(default)]
    pub manufacturers: Vec<String>,

    /// Concurrent manufacturers, each with its own browser context.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_manufacturers: usize,

    /// Open a fresh page for every token, not only for every model.
    #[serde(default = "default_true")]
    pub fresh_page_per_token: bool,

    /// Write screenshots and DOM dumps when an element cannot be resolved.
    #[serde(default = "default_true")]
    pub capture_debug: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            manufacturers: Vec::new(),
            max_concurrent_manufacturers: default_max_concurrent(),
            fresh_page_per_token: true,
            capture_debug: true,
        }
    }
}

fn default_max_concurrent() -> usize {
    1
}
