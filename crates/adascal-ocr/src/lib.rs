//! # adascal ocr
//!
//! [`TextRecognizer`](adascal_protocols::TextRecognizer) backed by the
//! `tesseract` command line tool. Images are converted to grayscale and
//! small ones are upscaled before recognition.

mod preprocess;
mod tesseract;

pub use preprocess::Preprocessor;
pub use tesseract::TesseractRecognizer;
