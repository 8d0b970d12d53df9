//! # adascal browser
//!
//! Chrome DevTools Protocol implementation of the page driver capability.
//!
//! ## Components
//!
//! - [`cdp`] - Minimal CDP client over a single browser WebSocket
//! - [`BrowserManager`] - Finds, launches and connects to Chrome
//! - [`CdpBrowserProvider`] - One isolated browser context per manufacturer
//! - [`CdpPageDriver`] - [`adascal_protocols::PageDriver`] over a CDP page session

pub mod cdp;
mod driver;
mod manager;

pub use driver::{CdpBrowserContext, CdpBrowserProvider, CdpPageDriver};
pub use manager::{BrowserError, BrowserManager, BrowserManagerConfig};
