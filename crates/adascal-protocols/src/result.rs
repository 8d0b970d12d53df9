//! Calibration results and their merge rules.
//!
//! Result files have the shape
//! `{ manufacturer: { models: { model: { token: { slot: value } } } } }`.
//! A slot is written at most once with a populated value: merging never
//! replaces a populated value and only upgrades `N/A`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::manufacturer::SystemSlot;

const NOT_AVAILABLE: &str = "N/A";
const LABEL_STATIC: &str = "Static Calibration";
const LABEL_DYNAMIC: &str = "Dynamic Calibration";
const LABEL_BOTH: &str = "Static Calibration+Dynamic Calibration";
const LABEL_STATIC_ASSUMED: &str = "Static Calibration (Assumed)";
const ASSUMED_SUFFIX: &str = " (Assumed)";

/// Calibration procedure detected on the result panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationType {
    Static,
    Dynamic,
    StaticAndDynamic,
    Unknown,
}

impl CalibrationType {
    /// Whether a target board applies, so a target code is worth looking for.
    pub fn involves_static(&self) -> bool {
        matches!(self, Self::Static | Self::StaticAndDynamic)
    }
}

/// How the calibration type was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// A text indicator on the page named the procedure.
    Confirmed,
    /// Only a calibration diagram was present; static is a best-effort default.
    Assumed,
}

/// Outcome of calibration type detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub calibration: CalibrationType,
    pub confidence: Confidence,
}

impl Detection {
    pub fn confirmed(calibration: CalibrationType) -> Self {
        Self {
            calibration,
            confidence: Confidence::Confirmed,
        }
    }

    pub fn assumed_static() -> Self {
        Self {
            calibration: CalibrationType::Static,
            confidence: Confidence::Assumed,
        }
    }

    pub fn unknown() -> Self {
        Self::confirmed(CalibrationType::Unknown)
    }

    /// Result-file label, `None` when the type could not be determined.
    pub fn label(&self) -> Option<&'static str> {
        match (self.calibration, self.confidence) {
            (CalibrationType::Unknown, _) => None,
            (CalibrationType::Static, Confidence::Assumed) => Some(LABEL_STATIC_ASSUMED),
            (CalibrationType::Static, _) => Some(LABEL_STATIC),
            (CalibrationType::Dynamic, _) => Some(LABEL_DYNAMIC),
            (CalibrationType::StaticAndDynamic, _) => Some(LABEL_BOTH),
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            LABEL_STATIC => Some(Self::confirmed(CalibrationType::Static)),
            LABEL_DYNAMIC => Some(Self::confirmed(CalibrationType::Dynamic)),
            LABEL_BOTH => Some(Self::confirmed(CalibrationType::StaticAndDynamic)),
            LABEL_STATIC_ASSUMED => Some(Self::assumed_static()),
            _ => None,
        }
    }
}

/// Value held by one system slot. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotValue {
    /// The system is not offered, or its calibration could not be determined.
    NotAvailable,
    /// Calibration type label without a target code.
    Calibration(Detection),
    /// Target board code, e.g. `AUTEL-CSC0601/01`. Codes read for an
    /// assumed static detection serialize as `<code> (Assumed)`.
    TargetCode { code: String, confidence: Confidence },
}

impl SlotValue {
    /// A target code read alongside a confirmed detection.
    pub fn target_code(code: impl Into<String>) -> Self {
        Self::TargetCode {
            code: code.into(),
            confidence: Confidence::Confirmed,
        }
    }

    /// Slot value for a detection, preferring the target code when one was read.
    /// The code keeps the detection's confidence.
    pub fn from_detection(detection: Detection, code: Option<String>) -> Self {
        match (detection.label(), code) {
            (None, _) => Self::NotAvailable,
            (Some(_), Some(code)) if detection.calibration.involves_static() => Self::TargetCode {
                code,
                confidence: detection.confidence,
            },
            (Some(_), _) => Self::Calibration(detection),
        }
    }

    pub fn is_populated(&self) -> bool {
        !matches!(self, Self::NotAvailable)
    }
}

impl From<String> for SlotValue {
    fn from(value: String) -> Self {
        if value == NOT_AVAILABLE {
            return Self::NotAvailable;
        }
        if let Some(detection) = Detection::from_label(&value) {
            return Self::Calibration(detection);
        }
        match value.strip_suffix(ASSUMED_SUFFIX) {
            Some(code) => Self::TargetCode {
                code: code.to_string(),
                confidence: Confidence::Assumed,
            },
            None => Self::target_code(value),
        }
    }
}

impl From<SlotValue> for String {
    fn from(value: SlotValue) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => f.write_str(NOT_AVAILABLE),
            Self::Calibration(detection) => f.write_str(detection.label().unwrap_or(NOT_AVAILABLE)),
            Self::TargetCode {
                code,
                confidence: Confidence::Confirmed,
            } => f.write_str(code),
            Self::TargetCode {
                code,
                confidence: Confidence::Assumed,
            } => write!(f, "{}{}", code, ASSUMED_SUFFIX),
        }
    }
}

/// Result record for one (manufacturer, model, token) combination.
///
/// A slot that is absent has not been visited yet; `N/A` means it was
/// visited and nothing could be recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdasResult {
    slots: BTreeMap<SystemSlot, SlotValue>,
}

impl AdasResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A result with every slot set to `N/A`.
    pub fn all_not_available() -> Self {
        let mut result = Self::new();
        for slot in SystemSlot::ALL {
            result.slots.insert(slot, SlotValue::NotAvailable);
        }
        result
    }

    pub fn get(&self, slot: SystemSlot) -> Option<&SlotValue> {
        self.slots.get(&slot)
    }

    /// Record a slot value, honouring the never-revert rule.
    /// Returns whether the stored value changed.
    pub fn set(&mut self, slot: SystemSlot, value: SlotValue) -> bool {
        match self.slots.get(&slot) {
            Some(existing) if existing.is_populated() || existing == &value => false,
            _ => {
                self.slots.insert(slot, value);
                true
            }
        }
    }

    /// Union-merge another result into this one.
    pub fn merge_from(&mut self, other: &AdasResult) -> bool {
        let mut changed = false;
        for (slot, value) in &other.slots {
            changed |= self.set(*slot, value.clone());
        }
        changed
    }

    /// Every fixed slot has been visited.
    pub fn is_complete(&self) -> bool {
        SystemSlot::ALL.iter().all(|slot| self.slots.contains_key(slot))
    }

    pub fn populated_count(&self) -> usize {
        self.slots.values().filter(|v| v.is_populated()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SystemSlot, &SlotValue)> {
        self.slots.iter()
    }
}

/// All results for one manufacturer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerResults {
    #[serde(default)]
    pub models: BTreeMap<String, BTreeMap<String, AdasResult>>,
}

impl ManufacturerResults {
    pub fn get(&self, model: &str, token: &str) -> Option<&AdasResult> {
        self.models.get(model).and_then(|tokens| tokens.get(token))
    }

    pub fn is_complete(&self, model: &str, token: &str) -> bool {
        self.get(model, token).is_some_and(AdasResult::is_complete)
    }

    /// Merge one combination's result in. Returns whether anything changed.
    pub fn record(&mut self, model: &str, token: &str, result: &AdasResult) -> bool {
        let entry = self
            .models
            .entry(model.to_string())
            .or_default()
            .entry(token.to_string());
        match entry {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(result.clone());
                true
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => slot.get_mut().merge_from(result),
        }
    }

    /// Union-merge every combination of `other` into this one.
    pub fn merge_from(&mut self, other: &ManufacturerResults) -> bool {
        let mut changed = false;
        for (model, tokens) in &other.models {
            for (token, result) in tokens {
                changed |= self.record(model, token, result);
            }
        }
        changed
    }

    /// (combinations, complete combinations)
    pub fn counts(&self) -> (usize, usize) {
        let mut total = 0;
        let mut complete = 0;
        for result in self.models.values().flat_map(BTreeMap::values) {
            total += 1;
            if result.is_complete() {
                complete += 1;
            }
        }
        (total, complete)
    }
}

/// Results for every manufacturer, keyed by canonical name.
pub type ResultSet = BTreeMap<String, ManufacturerResults>;

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
