//! Error types for the adascal protocol layer.

mod driver;
mod ocr;
mod scrape;

pub use driver::*;
pub use ocr::*;
pub use scrape::*;
