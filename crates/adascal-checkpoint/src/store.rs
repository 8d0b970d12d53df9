//! Checkpoint storage.

use std::collections::{BTreeMap, HashMap};

use adascal_protocols::{ManufacturerResults, ResultSet};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CheckpointError;

/// Token lists discovered per model, keyed by model label.
pub type ModelTokens = BTreeMap<String, Vec<String>>;

/// Persistence of partial and complete results.
///
/// `save` is an idempotent union merge: saving the same data twice, or a
/// partial result after a complete one, never loses a recorded slot.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Everything recorded so far for a manufacturer (empty when nothing is).
    async fn load(&self, manufacturer: &str) -> Result<ManufacturerResults, CheckpointError>;

    /// Whether the combination already has every system slot recorded.
    async fn has(&self, manufacturer: &str, model: &str, token: &str) -> Result<bool, CheckpointError> {
        Ok(self.load(manufacturer).await?.is_complete(model, token))
    }

    /// Merge `results` into the persisted data for a manufacturer.
    async fn save(&self, manufacturer: &str, results: &ManufacturerResults) -> Result<(), CheckpointError>;

    /// Token lists recorded for a manufacturer's models on earlier runs.
    async fn load_tokens(&self, manufacturer: &str) -> Result<ModelTokens, CheckpointError>;

    /// Record the tokens discovered for a model, replacing any earlier list.
    async fn save_tokens(
        &self,
        manufacturer: &str,
        model: &str,
        tokens: &[String],
    ) -> Result<(), CheckpointError>;

    /// Manufacturers with persisted data.
    async fn manufacturers(&self) -> Result<Vec<String>, CheckpointError>;

    /// Every persisted result. File-backed stores also write the combined
    /// document.
    async fn export_combined(&self) -> Result<ResultSet, CheckpointError>;
}

/// In-memory checkpoint store for testing.
pub struct MemoryCheckpointStore {
    results: RwLock<HashMap<String, ManufacturerResults>>,
    tokens: RwLock<HashMap<String, ModelTokens>>,
}

impl MemoryCheckpointStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-seeded with results.
    pub fn with_results(results: ResultSet) -> Self {
        Self {
            results: RwLock::new(results.into_iter().collect()),
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, manufacturer: &str) -> Result<ManufacturerResults, CheckpointError> {
        let store = self.results.read().await;
        Ok(store.get(manufacturer).cloned().unwrap_or_default())
    }

    async fn save(&self, manufacturer: &str, results: &ManufacturerResults) -> Result<(), CheckpointError> {
        let mut store = self.results.write().await;
        store
            .entry(manufacturer.to_string())
            .or_default()
            .merge_from(results);
        Ok(())
    }

    async fn load_tokens(&self, manufacturer: &str) -> Result<ModelTokens, CheckpointError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(manufacturer).cloned().unwrap_or_default())
    }

    async fn save_tokens(
        &self,
        manufacturer: &str,
        model: &str,
        tokens: &[String],
    ) -> Result<(), CheckpointError> {
        let mut store = self.tokens.write().await;
        store
            .entry(manufacturer.to_string())
            .or_default()
            .insert(model.to_string(), tokens.to_vec());
        Ok(())
    }

    async fn manufacturers(&self) -> Result<Vec<String>, CheckpointError> {
        let store = self.results.read().await;
        let mut names: Vec<String> = store.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn export_combined(&self) -> Result<ResultSet, CheckpointError> {
        let store = self.results.read().await;
        Ok(store.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adascal_protocols::{AdasResult, SlotValue, SystemSlot};

    fn partial(slot: SystemSlot, value: &str) -> ManufacturerResults {
        let mut result = AdasResult::new();
        result.set(slot, SlotValue::from(value.to_string()));
        let mut results = ManufacturerResults::default();
        results.record("3 Series", "F30", &result);
        results
    }

    #[tokio::test]
    async fn test_memory_store_has_requires_all_slots() {
        let store = MemoryCheckpointStore::new();
        store
            .save("BMW", &partial(SystemSlot::FrontRadar, "Dynamic Calibration"))
            .await
            .unwrap();
        assert!(!store.has("BMW", "3 Series", "F30").await.unwrap());

        let mut full = ManufacturerResults::default();
        full.record("3 Series", "F30", &AdasResult::all_not_available());
        store.save("BMW", &full).await.unwrap();
        assert!(store.has("BMW", "3 Series", "F30").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_never_loses_slots() {
        let store = MemoryCheckpointStore::new();
        store
            .save("BMW", &partial(SystemSlot::FrontRadar, "CSC0602/01"))
            .await
            .unwrap();
        store
            .save("BMW", &partial(SystemSlot::FrontRadar, "N/A"))
            .await
            .unwrap();

        let loaded = store.load("BMW").await.unwrap();
        let value = loaded.get("3 Series", "F30").unwrap().get(SystemSlot::FrontRadar);
        assert_eq!(value, Some(&SlotValue::target_code("CSC0602/01")));
    }

    #[tokio::test]
    async fn test_memory_store_token_list_is_replaced() {
        let store = MemoryCheckpointStore::new();
        store
            .save_tokens("BMW", "3 Series", &["F30".to_string()])
            .await
            .unwrap();
        store
            .save_tokens("BMW", "3 Series", &["G20".to_string(), "F30".to_string()])
            .await
            .unwrap();

        let tokens = store.load_tokens("BMW").await.unwrap();
        assert_eq!(tokens["3 Series"], vec!["G20", "F30"]);
        assert!(store.load_tokens("MINI").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_load_unknown_is_empty() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("SAAB").await.unwrap().models.is_empty());
        assert!(store.manufacturers().await.unwrap().is_empty());
    }
}
