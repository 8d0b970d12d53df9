//! Configuration validation.

use regex::Regex;
use url::Url;

use crate::catalogue::Catalogue;
use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Fold another result into this one.
    pub fn extend(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Strategy budgets above this are almost certainly a unit mistake.
const LARGE_TIMEOUT_MS: u64 = 60_000;

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the run configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_site(config, &mut result);
        Self::validate_timeouts(config, &mut result);
        Self::validate_extractor(config, &mut result);
        Self::validate_run(config, &mut result);

        Ok(result)
    }

    /// Validate the manufacturer table.
    pub fn validate_catalogue(catalogue: &Catalogue) -> ValidationResult {
        let mut result = ValidationResult::default();

        if catalogue.is_empty() {
            result.add_error(ValidationError::new(
                "manufacturers",
                "Catalogue contains no usable manufacturers",
            ));
        }

        for skipped in catalogue.skipped() {
            result.add_warning(ValidationWarning::new(
                format!("manufacturers[{}]", skipped.index),
                format!("Row skipped: {}", skipped.reason),
            ));
        }

        for manufacturer in catalogue.manufacturers() {
            let path = format!("manufacturers.{}", manufacturer.name);

            for region in &manufacturer.region_preference {
                if manufacturer
                    .excluded_regions
                    .iter()
                    .any(|excluded| excluded.eq_ignore_ascii_case(region))
                {
                    result.add_warning(ValidationWarning::new(
                        format!("{}.region_preference", path),
                        format!("Region '{}' is both preferred and excluded", region),
                    ));
                }
            }

            if manufacturer.system_aliases.values().all(Vec::is_empty) {
                result.add_warning(ValidationWarning::new(
                    format!("{}.system_aliases", path),
                    "No system aliases, every slot will be N/A",
                ));
            }

            if let Some(rule) = &manufacturer.vehicle_config {
                if rule.preferences.is_empty() && !rule.fallback_first {
                    result.add_error(ValidationError::new(
                        format!("{}.vehicle_config", path),
                        "No preferences and fallback_first disabled, no option can ever be chosen",
                    ));
                }
            }
        }

        result
    }

    fn validate_site(config: &Config, result: &mut ValidationResult) {
        if config.site.url.is_empty() {
            result.add_error(ValidationError::new("site.url", "URL cannot be empty"));
        } else if let Err(e) = Url::parse(&config.site.url) {
            result.add_error(ValidationError::new(
                "site.url",
                format!("Invalid URL: {}", e),
            ));
        }

        if config.site.result_markers.is_empty() {
            result.add_error(ValidationError::new(
                "site.result_markers",
                "At least one result marker selector is required",
            ));
        }

        let panels = [
            ("product_type", &config.site.panels.product_type),
            ("make", &config.site.panels.make),
            ("model", &config.site.panels.model),
            ("year", &config.site.panels.year),
            ("vehicle_config", &config.site.panels.vehicle_config),
            ("system", &config.site.panels.system),
        ];
        for (name, panel) in panels {
            if panel.container.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("site.panels.{}.container", name),
                    "Container selector cannot be empty",
                ));
            }
        }
    }

    fn validate_timeouts(config: &Config, result: &mut ValidationResult) {
        let timeouts = &config.timeouts;

        if timeouts.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "timeouts.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if timeouts.detection_attempts == 0 {
            result.add_error(ValidationError::new(
                "timeouts.detection_attempts",
                "detection_attempts must be greater than 0",
            ));
        }

        if timeouts.poll_interval_ms > timeouts.marker_wait_ms {
            result.add_warning(ValidationWarning::new(
                "timeouts.poll_interval_ms",
                "poll interval exceeds marker_wait_ms, markers are checked at most once",
            ));
        }

        let strategies = [
            ("structural_ms", timeouts.structural_ms),
            ("exact_ms", timeouts.exact_ms),
            ("contains_ms", timeouts.contains_ms),
            ("text_walk_ms", timeouts.text_walk_ms),
        ];
        for (name, value) in strategies {
            if value > LARGE_TIMEOUT_MS {
                result.add_warning(ValidationWarning::new(
                    format!("timeouts.{}", name),
                    format!("{} ms is very high, failed lookups will stall the run", value),
                ));
            }
        }
    }

    fn validate_extractor(config: &Config, result: &mut ValidationResult) {
        if let Err(e) = Regex::new(&config.extractor.code_pattern) {
            result.add_error(ValidationError::new(
                "extractor.code_pattern",
                format!("Invalid regex: {}", e),
            ));
        }

        if config.ocr.enabled && config.ocr.command.trim().is_empty() {
            result.add_error(ValidationError::new(
                "ocr.command",
                "OCR is enabled but no command is set",
            ));
        }
    }

    fn validate_run(config: &Config, result: &mut ValidationResult) {
        if config.run.max_concurrent_manufacturers == 0 {
            result.add_error(ValidationError::new(
                "run.max_concurrent_manufacturers",
                "max_concurrent_manufacturers must be greater than 0",
            ));
        }

        if config.run.max_concurrent_manufacturers > 4 {
            result.add_warning(ValidationWarning::new(
                "run.max_concurrent_manufacturers",
                "More than 4 concurrent browser contexts may trip the site's rate limits",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
