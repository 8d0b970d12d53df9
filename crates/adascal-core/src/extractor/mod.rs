//! Calibration type detection and target code extraction.
//!
//! Runs once the automaton has reached `SystemSelected`. Detection looks
//! for, in order: a combined label, independent static and dynamic
//! indicators, the same labels in the page text, and finally a calibration
//! diagram, which yields an *assumed* static result. Target codes are read
//! from page text, then from OCR of calibration images, then from the text
//! of code-bearing containers.

use std::sync::Arc;
use std::time::Duration;

use adascal_config::{Config, ExtractorConfig, OcrConfig};
use adascal_protocols::{
    CalibrationType, Detection, DriverError, ElementHandle, OcrError, PageDriver, ScrapeError,
    SlotValue, TextRecognizer,
};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::resolver::{ElementResolver, Target};

pub struct CalibrationExtractor {
    resolver: Arc<ElementResolver>,
    config: ExtractorConfig,
    ocr: OcrConfig,
    attempts: u32,
    pause: Duration,
    recognizer: Option<Arc<dyn TextRecognizer>>,
    code_pattern: Regex,
}

impl CalibrationExtractor {
    pub fn new(
        resolver: Arc<ElementResolver>,
        config: &Config,
        recognizer: Option<Arc<dyn TextRecognizer>>,
    ) -> Result<Self, ScrapeError> {
        let code_pattern = Regex::new(&config.extractor.code_pattern).map_err(|e| {
            ScrapeError::ConfigurationError(format!("invalid extractor.code_pattern: {}", e))
        })?;
        Ok(Self {
            resolver,
            config: config.extractor.clone(),
            ocr: config.ocr.clone(),
            attempts: config.timeouts.detection_attempts.max(1),
            pause: config.timeouts.detection_pause(),
            recognizer,
            code_pattern,
        })
    }

    /// Slot value for the rendered result panel.
    ///
    /// An undeterminable calibration type is an
    /// [`ScrapeError::ExtractionFailure`]; the caller records `N/A`.
    pub async fn extract(&self, page: &dyn PageDriver, system: &str) -> Result<SlotValue, ScrapeError> {
        let detection = self.detect(page).await?;
        if detection.calibration == CalibrationType::Unknown {
            return Err(ScrapeError::ExtractionFailure(format!(
                "no calibration indicator for '{}'",
                system
            )));
        }
        let code = if detection.calibration.involves_static() {
            self.extract_target_code(page).await?
        } else {
            None
        };
        let value = SlotValue::from_detection(detection, code);
        info!("{}: {}", system, value);
        Ok(value)
    }

    /// Detect the calibration type, retrying while the panel renders.
    pub async fn detect(&self, page: &dyn PageDriver) -> Result<Detection, DriverError> {
        for attempt in 1..=self.attempts {
            if let Some(detection) = self.detect_from_text(page).await? {
                return Ok(detection);
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.pause).await;
            }
        }

        let diagrams = self.config.diagram_selectors.join(", ");
        if page.query_all(&diagrams).await?.iter().any(ElementHandle::is_visible) {
            debug!("Only a calibration diagram is shown; assuming static");
            return Ok(Detection::assumed_static());
        }
        Ok(Detection::unknown())
    }

    async fn detect_from_text(&self, page: &dyn PageDriver) -> Result<Option<Detection>, DriverError> {
        for label in &self.config.combined_labels {
            if self.resolver.probe(page, &Target::indicator(label)).await?.is_some() {
                return Ok(Some(Detection::confirmed(CalibrationType::StaticAndDynamic)));
            }
        }

        let static_label = self.config.static_label.to_lowercase();
        let dynamic_label = self.config.dynamic_label.to_lowercase();
        let indicators = self.config.indicator_selectors.join(", ");
        let combined = page.query_all(&indicators).await?.into_iter().any(|e| {
            let text = e.text.to_lowercase();
            e.is_visible()
                && text.chars().count() <= self.config.combined_max_len
                && text.contains(&static_label)
                && text.contains(&dynamic_label)
        });
        if combined {
            return Ok(Some(Detection::confirmed(CalibrationType::StaticAndDynamic)));
        }

        let has_static = self
            .resolver
            .probe(page, &Target::indicator(&self.config.static_label))
            .await?
            .is_some();
        let has_dynamic = self
            .resolver
            .probe(page, &Target::indicator(&self.config.dynamic_label))
            .await?
            .is_some();
        if let Some(detection) = combine(has_static, has_dynamic) {
            return Ok(Some(detection));
        }

        let body = page.body_text().await?.to_lowercase();
        Ok(combine(body.contains(&static_label), body.contains(&dynamic_label)))
    }

    /// First target code found in page text, calibration images or
    /// code containers.
    pub async fn extract_target_code(&self, page: &dyn PageDriver) -> Result<Option<String>, DriverError> {
        if let Some(code) = find_target_code(&self.code_pattern, &page.body_text().await?) {
            return Ok(Some(code));
        }

        if let Some(code) = self.code_from_images(page).await? {
            return Ok(Some(code));
        }

        // Hidden carousel slides are included; their text is not in the body text.
        let containers = self.config.code_containers.join(", ");
        Ok(page
            .query_all(&containers)
            .await?
            .iter()
            .find_map(|e| find_target_code(&self.code_pattern, &e.text)))
    }

    async fn code_from_images(&self, page: &dyn PageDriver) -> Result<Option<String>, DriverError> {
        let Some(recognizer) = self.recognizer.as_ref().filter(|_| self.ocr.enabled) else {
            return Ok(None);
        };

        let images: Vec<ElementHandle> = page
            .query_all("img")
            .await?
            .into_iter()
            .filter(|img| self.is_candidate_image(img))
            .collect();
        debug!("{} candidate calibration images", images.len());

        for image in &images {
            let png = match page.screenshot(Some(image)).await {
                Ok(png) => png,
                Err(DriverError::Closed) => return Err(DriverError::Closed),
                Err(e) => {
                    warn!("Could not capture image {}: {}", image.id, e);
                    continue;
                }
            };
            match recognizer.recognize(&png).await {
                Ok(text) => {
                    if let Some(code) = find_target_code(&self.code_pattern, &text) {
                        debug!("OCR read {} from image {}", code, image.id);
                        return Ok(Some(code));
                    }
                }
                Err(OcrError::Unavailable(reason)) => {
                    warn!("OCR unavailable, skipping images: {}", reason);
                    break;
                }
                Err(e) => warn!("OCR failed on image {}: {}", image.id, e),
            }
        }
        Ok(None)
    }

    fn is_candidate_image(&self, image: &ElementHandle) -> bool {
        if !image.is_visible() {
            return false;
        }
        let dimension = |natural: &str, rendered: f64| {
            image
                .attr(natural)
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v > 0.0)
                .unwrap_or(rendered)
        };
        let width = dimension("naturalWidth", image.bounds.width);
        let height = dimension("naturalHeight", image.bounds.height);
        if width < self.ocr.min_width as f64 || height < self.ocr.min_height as f64 {
            return false;
        }
        let src = image.attr("src").unwrap_or_default().to_lowercase();
        self.ocr
            .asset_patterns
            .iter()
            .any(|pattern| src.contains(&pattern.to_lowercase()))
    }
}

fn combine(has_static: bool, has_dynamic: bool) -> Option<Detection> {
    match (has_static, has_dynamic) {
        (true, true) => Some(Detection::confirmed(CalibrationType::StaticAndDynamic)),
        (true, false) => Some(Detection::confirmed(CalibrationType::Static)),
        (false, true) => Some(Detection::confirmed(CalibrationType::Dynamic)),
        (false, false) => None,
    }
}

/// First match of the target code pattern, unchanged.
pub fn find_target_code(pattern: &Regex, text: &str) -> Option<String> {
    pattern.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
