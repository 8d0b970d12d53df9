//! Chrome DevTools Protocol (CDP) client.
//!
//! One WebSocket to the browser endpoint carries every command. Pages are
//! attached in flattened mode, so page commands travel over the same socket
//! tagged with their session ID.
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9222").await?;
//! let context = client.create_browser_context().await?;
//! let page = client.new_page_in_context(&context).await?;
//! page.navigate("https://example.com", Duration::from_secs(30)).await?;
//! ```

mod client;
mod error;
mod protocol;
mod session;
mod transport;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
