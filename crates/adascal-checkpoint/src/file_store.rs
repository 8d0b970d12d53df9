//! File system backed checkpoint store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use adascal_protocols::{ManufacturerResults, ResultSet};
use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CheckpointError;
use crate::store::{CheckpointStore, ModelTokens};

const RESULTS_SUFFIX: &str = "_results.json";
const TOKENS_SUFFIX: &str = "_tokens.json";
const COMBINED_FILE: &str = "all_results.json";

/// Checkpoint store writing one JSON document per manufacturer:
/// ```text
/// {results_dir}/
/// ├── BMW_results.json          { "BMW": { "models": { ... } } }
/// ├── BMW_tokens.json           { "BMW": { "3 Series": ["G20", "F30"] } }
/// ├── LAND_ROVER_results.json
/// └── all_results.json          combined export
/// ```
///
/// Every write goes to a temporary file that is renamed over the target,
/// so a crash mid-write leaves the previous good file in place.
pub struct FileCheckpointStore {
    results_dir: PathBuf,
    /// Merged view of every manufacturer loaded or saved in this process.
    /// The mutex also serializes writers.
    cache: Mutex<HashMap<String, ManufacturerResults>>,
    tokens: Mutex<HashMap<String, ModelTokens>>,
}

impl FileCheckpointStore {
    /// Create a store rooted at `results_dir`, creating the directory.
    pub async fn new(results_dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let results_dir = results_dir.into();
        fs::create_dir_all(&results_dir).await?;
        debug!("FileCheckpointStore initialized at {:?}", results_dir);
        Ok(Self {
            results_dir,
            cache: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Path of the combined export.
    pub fn combined_path(&self) -> PathBuf {
        self.results_dir.join(COMBINED_FILE)
    }

    fn manufacturer_path(&self, manufacturer: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{}", Self::sanitize_name(manufacturer), RESULTS_SUFFIX))
    }

    fn tokens_path(&self, manufacturer: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}{}", Self::sanitize_name(manufacturer), TOKENS_SUFFIX))
    }

    /// File-name-safe form of a manufacturer name.
    fn sanitize_name(name: &str) -> String {
        name.chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }

    async fn read_document(path: &Path) -> Result<ResultSet, CheckpointError> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| CheckpointError::InvalidData {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Read a manufacturer's file from disk, empty when there is none.
    async fn read_manufacturer(&self, manufacturer: &str) -> Result<ManufacturerResults, CheckpointError> {
        let path = self.manufacturer_path(manufacturer);
        if !path.exists() {
            return Ok(ManufacturerResults::default());
        }
        let mut document = Self::read_document(&path).await?;
        Ok(document.remove(manufacturer).unwrap_or_default())
    }

    async fn read_tokens(&self, manufacturer: &str) -> Result<ModelTokens, CheckpointError> {
        let path = self.tokens_path(manufacturer);
        if !path.exists() {
            return Ok(ModelTokens::new());
        }
        let content = fs::read_to_string(&path).await?;
        let mut document: BTreeMap<String, ModelTokens> =
            serde_json::from_str(&content).map_err(|e| CheckpointError::InvalidData {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(document.remove(manufacturer).unwrap_or_default())
    }

    /// Serialize `value` and move it into place atomically.
    async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckpointError> {
        let content = serde_json::to_string_pretty(value).map_err(|e| {
            CheckpointError::Serialization(format!("Failed to serialize results: {}", e))
        })?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Result files currently in the directory, excluding the combined export.
    async fn result_files(&self) -> Result<Vec<PathBuf>, CheckpointError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.results_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(RESULTS_SUFFIX) && name != COMBINED_FILE {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_all(&self) -> Result<ResultSet, CheckpointError> {
        let mut combined = ResultSet::new();
        for path in self.result_files().await? {
            match Self::read_document(&path).await {
                Ok(document) => {
                    for (manufacturer, results) in document {
                        combined.entry(manufacturer).or_default().merge_from(&results);
                    }
                }
                Err(e) => warn!("Skipping unreadable result file {:?}: {}", path, e),
            }
        }

        let cache = self.cache.lock().await;
        for (manufacturer, results) in cache.iter() {
            combined
                .entry(manufacturer.clone())
                .or_default()
                .merge_from(results);
        }
        Ok(combined)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, manufacturer: &str) -> Result<ManufacturerResults, CheckpointError> {
        let mut cache = self.cache.lock().await;
        if let Some(results) = cache.get(manufacturer) {
            return Ok(results.clone());
        }
        let results = self.read_manufacturer(manufacturer).await?;
        cache.insert(manufacturer.to_string(), results.clone());
        Ok(results)
    }

    async fn save(&self, manufacturer: &str, results: &ManufacturerResults) -> Result<(), CheckpointError> {
        let mut cache = self.cache.lock().await;
        let mut merged = match cache.get(manufacturer) {
            Some(existing) => existing.clone(),
            None => self.read_manufacturer(manufacturer).await?,
        };
        let changed = merged.merge_from(results);

        let path = self.manufacturer_path(manufacturer);
        if changed || !path.exists() {
            let mut document = ResultSet::new();
            document.insert(manufacturer.to_string(), merged.clone());
            Self::write_atomic(&path, &document).await?;
            let (total, complete) = merged.counts();
            debug!(
                "Saved {} results to {:?} ({}/{} complete)",
                manufacturer, path, complete, total
            );
        }

        cache.insert(manufacturer.to_string(), merged);
        Ok(())
    }

    async fn load_tokens(&self, manufacturer: &str) -> Result<ModelTokens, CheckpointError> {
        let mut tokens = self.tokens.lock().await;
        if let Some(known) = tokens.get(manufacturer) {
            return Ok(known.clone());
        }
        let known = self.read_tokens(manufacturer).await?;
        tokens.insert(manufacturer.to_string(), known.clone());
        Ok(known)
    }

    async fn save_tokens(
        &self,
        manufacturer: &str,
        model: &str,
        list: &[String],
    ) -> Result<(), CheckpointError> {
        let mut tokens = self.tokens.lock().await;
        let mut known = match tokens.get(manufacturer) {
            Some(known) => known.clone(),
            None => self.read_tokens(manufacturer).await?,
        };
        let changed = known.get(model).map(Vec::as_slice) != Some(list);
        known.insert(model.to_string(), list.to_vec());

        let path = self.tokens_path(manufacturer);
        if changed || !path.exists() {
            let mut document = BTreeMap::new();
            document.insert(manufacturer.to_string(), known.clone());
            Self::write_atomic(&path, &document).await?;
            debug!("Recorded {} tokens for {} {}", list.len(), manufacturer, model);
        }

        tokens.insert(manufacturer.to_string(), known);
        Ok(())
    }

    async fn manufacturers(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self.read_all().await?.into_keys().collect())
    }

    async fn export_combined(&self) -> Result<ResultSet, CheckpointError> {
        let combined = self.read_all().await?;
        let path = self.combined_path();
        Self::write_atomic(&path, &combined).await?;
        debug!("Exported {} manufacturers to {:?}", combined.len(), path);
        Ok(combined)
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
