//! Text recognition capability consumed by the calibration extractor.

use async_trait::async_trait;

use crate::error::OcrError;

/// OCR engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in a PNG-encoded bitmap.
    async fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;
}
