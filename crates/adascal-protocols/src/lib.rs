//! # adascal protocols
//!
//! Domain types and boundary traits shared by every adascal crate.
//! Contains only definitions - no browser or OCR implementations.
//!
//! ## Core Traits
//!
//! - [`PageDriver`] - Browser page capability consumed by the engine
//! - [`BrowserContext`] - Isolated browser context that hands out fresh pages
//! - [`BrowserProvider`] - Opens one isolated context per manufacturer
//! - [`TextRecognizer`] - OCR capability consumed by the extractor

pub mod driver;
pub mod error;
pub mod manufacturer;
pub mod ocr;
pub mod result;

pub use driver::{BrowserContext, BrowserProvider, ElementHandle, PageDriver, Rect};
pub use error::{DriverError, OcrError, ScrapeError};
pub use manufacturer::{
    Manufacturer, ModelEntry, SortKey, SystemSlot, TokenOrigin, VehicleConfigRule, YearEncoding,
    YearOrChassisToken, WHOLE_MODEL_TOKEN,
};
pub use ocr::TextRecognizer;
pub use result::{
    AdasResult, CalibrationType, Confidence, Detection, ManufacturerResults, ResultSet, SlotValue,
};
