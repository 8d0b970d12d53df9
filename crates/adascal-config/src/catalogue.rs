//! Manufacturer classification table.
//!
//! The catalogue file is a JSON object with shared `defaults` and a
//! `manufacturers` array. Rows are decoded one at a time: a malformed row is
//! logged and skipped, never fatal for the other rows.
//!
//! ```json
//! {
//!   "defaults": { "region_preference": ["USA"], "system_aliases": { ... } },
//!   "manufacturers": [
//!     { "name": "BMW", "site_name": "BMW", "year_encoding": "chassis_code" },
//!     { "name": "JEEP", "site_name": "Jeep", "year_encoding": "plain_year",
//!       "system_aliases_from": "RAM" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use adascal_protocols::{Manufacturer, SystemSlot};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Values inherited by every row that does not set its own.
#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogueDefaults {
    #[serde(default)]
    region_preference: Vec<String>,

    #[serde(default)]
    excluded_regions: Vec<String>,

    #[serde(default)]
    banned_keywords: Vec<String>,

    #[serde(default)]
    system_aliases: BTreeMap<SystemSlot, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default)]
    defaults: CatalogueDefaults,

    manufacturers: Vec<Value>,
}

/// A row that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub index: usize,
    pub name: Option<String>,
    pub reason: String,
}

/// Loaded manufacturer table, in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    manufacturers: Vec<Manufacturer>,
    skipped: Vec<SkippedRow>,
}

impl Catalogue {
    /// Load the catalogue from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a catalogue document. Only a document that is not a catalogue
    /// at all is an error; bad rows are skipped.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: CatalogueFile = serde_json::from_str(content)?;
        let mut catalogue = Catalogue::default();
        let mut alias_sources: Vec<(usize, String)> = Vec::new();
        let mut own_aliases: Vec<BTreeMap<SystemSlot, Vec<String>>> = Vec::new();

        for (index, row) in file.manufacturers.into_iter().enumerate() {
            let name = row.get("name").and_then(Value::as_str).map(str::to_string);
            match Self::decode_row(row, &file.defaults) {
                Ok((manufacturer, aliases_from)) => {
                    if catalogue.get(&manufacturer.name).is_some() {
                        catalogue.skip(index, name, "duplicate manufacturer name");
                        continue;
                    }
                    let position = catalogue.manufacturers.len();
                    if let Some(source) = aliases_from {
                        alias_sources.push((position, source));
                    }
                    own_aliases.push(manufacturer.system_aliases.clone());
                    catalogue.manufacturers.push(manufacturer);
                }
                Err(reason) => catalogue.skip(index, name, &reason),
            }
        }

        catalogue.resolve_alias_sources(&file.defaults, &alias_sources, &own_aliases);
        debug!(
            "Loaded {} manufacturers ({} skipped)",
            catalogue.manufacturers.len(),
            catalogue.skipped.len()
        );
        Ok(catalogue)
    }

    fn skip(&mut self, index: usize, name: Option<String>, reason: &str) {
        warn!(
            "Skipping manufacturer row {} ({}): {}",
            index,
            name.as_deref().unwrap_or("<unnamed>"),
            reason
        );
        self.skipped.push(SkippedRow {
            index,
            name,
            reason: reason.to_string(),
        });
    }

    fn decode_row(
        mut row: Value,
        defaults: &CatalogueDefaults,
    ) -> Result<(Manufacturer, Option<String>), String> {
        let object = row
            .as_object_mut()
            .ok_or_else(|| "row is not an object".to_string())?;
        let aliases_from = match object.remove("system_aliases_from") {
            Some(Value::String(source)) => Some(source),
            Some(Value::Null) | None => None,
            Some(_) => return Err("system_aliases_from must be a string".to_string()),
        };

        let mut manufacturer: Manufacturer =
            serde_json::from_value(row).map_err(|e| e.to_string())?;

        if manufacturer.name.trim().is_empty() {
            return Err("empty name".to_string());
        }
        if manufacturer.site_name.trim().is_empty() {
            return Err("empty site_name".to_string());
        }
        if let Some(rule) = &manufacturer.vehicle_config {
            for pattern in &rule.preferences {
                Regex::new(pattern)
                    .map_err(|e| format!("invalid vehicle_config pattern '{}': {}", pattern, e))?;
            }
        }

        if manufacturer.region_preference.is_empty() {
            manufacturer.region_preference = defaults.region_preference.clone();
        }
        if manufacturer.excluded_regions.is_empty() {
            manufacturer.excluded_regions = defaults.excluded_regions.clone();
        }
        for word in &defaults.banned_keywords {
            if !manufacturer.banned_keywords.contains(word) {
                manufacturer.banned_keywords.push(word.clone());
            }
        }

        Ok((manufacturer, aliases_from))
    }

    /// Layer system aliases: defaults, then the alias source's own rows,
    /// then the manufacturer's own rows.
    fn resolve_alias_sources(
        &mut self,
        defaults: &CatalogueDefaults,
        alias_sources: &[(usize, String)],
        own_aliases: &[BTreeMap<SystemSlot, Vec<String>>],
    ) {
        let sources: BTreeMap<usize, &str> = alias_sources
            .iter()
            .map(|(position, source)| (*position, source.as_str()))
            .collect();

        let mut resolved = Vec::with_capacity(self.manufacturers.len());
        for (position, own) in own_aliases.iter().enumerate() {
            let mut aliases = defaults.system_aliases.clone();
            if let Some(source) = sources.get(&position) {
                match self.position(source) {
                    Some(source_position) => aliases.extend(own_aliases[source_position].clone()),
                    None => warn!(
                        "{}: system_aliases_from references unknown manufacturer {}",
                        self.manufacturers[position].name, source
                    ),
                }
            }
            aliases.extend(own.clone());
            resolved.push(aliases);
        }

        for (manufacturer, aliases) in self.manufacturers.iter_mut().zip(resolved) {
            manufacturer.system_aliases = aliases;
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.manufacturers
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Look up a manufacturer by canonical name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Manufacturer> {
        self.position(name).map(|i| &self.manufacturers[i])
    }

    pub fn manufacturers(&self) -> &[Manufacturer] {
        &self.manufacturers
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.manufacturers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manufacturers.is_empty()
    }

    /// Resolve a name filter against the catalogue. An empty filter selects
    /// every manufacturer. Unknown names come back separately.
    pub fn select(&self, names: &[String]) -> (Vec<Manufacturer>, Vec<ConfigError>) {
        if names.is_empty() {
            return (self.manufacturers.clone(), Vec::new());
        }
        let mut selected = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            match self.get(name) {
                Some(manufacturer) => selected.push(manufacturer.clone()),
                None => missing.push(ConfigError::UnknownManufacturer(name.clone())),
            }
        }
        (selected, missing)
    }
}

#[cfg(test)]
#[path = "catalogue_tests.rs"]
mod tests;
