//! Image preparation before recognition.

use std::io::Cursor;

use adascal_protocols::OcrError;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Grayscale conversion plus upscaling of narrow images.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    /// Images narrower than this are upscaled.
    pub upscale_below: u32,
    pub upscale_factor: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            upscale_below: 400,
            upscale_factor: 2,
        }
    }
}

impl Preprocessor {
    /// Decode, normalise and re-encode as PNG.
    pub fn apply(&self, png: &[u8]) -> Result<Vec<u8>, OcrError> {
        let img = image::load_from_memory(png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        encode_png(&self.transform(img))
    }

    fn transform(&self, img: DynamicImage) -> DynamicImage {
        let gray = img.grayscale();
        if self.upscale_factor > 1 && gray.width() < self.upscale_below {
            gray.resize(
                gray.width() * self.upscale_factor,
                gray.height() * self.upscale_factor,
                FilterType::Lanczos3,
            )
        } else {
            gray
        }
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| OcrError::InvalidImage(format!("Failed to encode image: {}", e)))?;
    Ok(buffer.into_inner())
}
