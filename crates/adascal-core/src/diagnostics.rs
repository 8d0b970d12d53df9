//! Debug artifacts written when a target cannot be resolved.

use std::path::{Path, PathBuf};

use adascal_protocols::PageDriver;
use chrono::Utc;
use tracing::{debug, warn};

/// Writes `screenshot_<step>_<ts>.png` and `page_source_<step>_<ts>.html`.
///
/// Capture never fails the caller; problems are logged and swallowed.
#[derive(Debug, Clone)]
pub struct DebugCapture {
    dir: PathBuf,
}

impl DebugCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn capture(&self, page: &dyn PageDriver, step: &str) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Cannot create debug directory {}: {}", self.dir.display(), e);
            return;
        }
        let step = sanitize_step_name(step);
        let ts = Utc::now().format("%Y%m%d_%H%M%S%3f");

        match page.screenshot(None).await {
            Ok(png) => {
                let path = self.dir.join(format!("screenshot_{}_{}.png", step, ts));
                if let Err(e) = tokio::fs::write(&path, png).await {
                    warn!("Failed to write {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Debug screenshot for {} failed: {}", step, e),
        }

        match page.content().await {
            Ok(html) => {
                let path = self.dir.join(format!("page_source_{}_{}.html", step, ts));
                if let Err(e) = tokio::fs::write(&path, html).await {
                    warn!("Failed to write {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Debug page source for {} failed: {}", step, e),
        }

        debug!("Captured debug artifacts for {} in {}", step, self.dir.display());
    }
}

/// File-name safe step name.
pub fn sanitize_step_name(step: &str) -> String {
    let cleaned: String = step
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('_');
    let mut name: String = trimmed.chars().take(80).collect();
    if name.is_empty() {
        name.push_str("step");
    }
    name
}
