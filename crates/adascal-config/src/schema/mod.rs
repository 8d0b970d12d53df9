//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_extract;
mod schema_run;
mod schema_timing;

pub use schema_extract::*;
pub use schema_run::*;
pub use schema_timing::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// Layout of the target site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_product_type")]
    pub product_type: String,

    #[serde(default)]
    pub panels: PanelsConfig,

    /// Selectors whose appearance shows the result panel rendered after a
    /// system was selected.
    #[serde(default = "default_result_markers")]
    pub result_markers: Vec<String>,

    /// Key used to dismiss an open dropdown.
    #[serde(default = "default_dismiss_key")]
    pub dismiss_key: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            product_type: default_product_type(),
            panels: PanelsConfig::default(),
            result_markers: default_result_markers(),
            dismiss_key: default_dismiss_key(),
        }
    }
}

fn default_url() -> String {
    "https://www.maxisysadas.com/getCoverage.jspx".to_string()
}

fn default_product_type() -> String {
    "MA600".to_string()
}

fn default_result_markers() -> Vec<String> {
    strings(&[
        ".swiper-slide",
        ".calibration-container",
        ".calibration-info",
        ".calibration-image",
    ])
}

fn default_dismiss_key() -> String {
    "Escape".to_string()
}

/// One selector panel of the cascading UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Placeholder of the input that opens the panel, if any.
    #[serde(default)]
    pub input: Option<String>,

    /// Selector of the container holding the panel's options.
    pub container: String,

    /// Option element selector(s) relative to the container, comma separated.
    #[serde(default = "default_option")]
    pub option: String,
}

fn default_option() -> String {
    "li".to_string()
}

impl PanelConfig {
    fn new(input: Option<&str>, container: &str, option: &str) -> Self {
        Self {
            input: input.map(str::to_string),
            container: container.to_string(),
            option: option.to_string(),
        }
    }

    /// Option selector scoped to the container.
    pub fn option_selector(&self) -> String {
        self.option
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| format!("{} {}", self.container, part))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Selector of the opening input, if the panel has one.
    pub fn input_selector(&self) -> Option<String> {
        self.input
            .as_ref()
            .map(|placeholder| format!("input[placeholder=\"{}\"]", placeholder.replace('"', "\\\"")))
    }
}

/// Every panel of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelsConfig {
    #[serde(default = "default_product_type_panel")]
    pub product_type: PanelConfig,

    #[serde(default = "default_make_panel")]
    pub make: PanelConfig,

    #[serde(default = "default_model_panel")]
    pub model: PanelConfig,

    #[serde(default = "default_year_panel")]
    pub year: PanelConfig,

    #[serde(default = "default_vehicle_config_panel")]
    pub vehicle_config: PanelConfig,

    #[serde(default = "default_system_panel")]
    pub system: PanelConfig,
}

impl Default for PanelsConfig {
    fn default() -> Self {
        Self {
            product_type: default_product_type_panel(),
            make: default_make_panel(),
            model: default_model_panel(),
            year: default_year_panel(),
            vehicle_config: default_vehicle_config_panel(),
            system: default_system_panel(),
        }
    }
}

fn default_product_type_panel() -> PanelConfig {
    PanelConfig::new(Some("Product type"), ".dropbox", "li")
}

fn default_make_panel() -> PanelConfig {
    PanelConfig::new(Some("Make/Model/Year"), ".dropbox.level1", "li")
}

fn default_model_panel() -> PanelConfig {
    PanelConfig::new(None, ".dropbox.level2", "li")
}

fn default_year_panel() -> PanelConfig {
    PanelConfig::new(Some("Year/System"), ".dropbox.level3", "li, td")
}

fn default_vehicle_config_panel() -> PanelConfig {
    PanelConfig::new(Some("Engine/vehicle configuration/System"), ".dropbox", "li")
}

fn default_system_panel() -> PanelConfig {
    PanelConfig::new(Some("System"), ".dropbox", "li")
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
