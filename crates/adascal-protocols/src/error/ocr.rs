//! Text recognizer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("OCR timed out after {0} ms")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = OcrError::Unavailable("tesseract not on PATH".to_string());
        assert!(err.to_string().contains("unavailable"));
        assert!(err.to_string().contains("tesseract"));
    }

    #[test]
    fn test_timeout_display() {
        let err = OcrError::Timeout(1500);
        assert_eq!(err.to_string(), "OCR timed out after 1500 ms");
    }
}
