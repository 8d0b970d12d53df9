//! Manufacturer, model and year/chassis token types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Token key used for manufacturers whose models have no year axis.
pub const WHOLE_MODEL_TOKEN: &str = "ALL";

/// How a manufacturer encodes the year axis of its vehicles on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearEncoding {
    /// A four digit model year, optionally with a single letter suffix (`2021 (A)`).
    PlainYear,
    /// A generation code such as `F30` or `G20`.
    ChassisCode,
    /// A year range or open-ended year embedded in a designation (`2017-2023`, `2019>`).
    ModelDesignation,
    /// The model has no year axis at all.
    NoYear,
    /// A three letter model code (used by a handful of individual models).
    ModelCode,
}

impl fmt::Display for YearEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PlainYear => "plain_year",
            Self::ChassisCode => "chassis_code",
            Self::ModelDesignation => "model_designation",
            Self::NoYear => "no_year",
            Self::ModelCode => "model_code",
        };
        f.write_str(name)
    }
}

/// One of the fixed ADAS system slots recorded for every combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemSlot {
    #[serde(rename = "adas_blind_spot_monitor")]
    BlindSpotMonitor,
    #[serde(rename = "adas_windshield_camera")]
    WindshieldCamera,
    #[serde(rename = "adas_front_radar")]
    FrontRadar,
    #[serde(rename = "adas_360_camera")]
    SurroundCamera,
}

impl SystemSlot {
    /// Every slot, in result-file order.
    pub const ALL: [SystemSlot; 4] = [
        SystemSlot::BlindSpotMonitor,
        SystemSlot::WindshieldCamera,
        SystemSlot::FrontRadar,
        SystemSlot::SurroundCamera,
    ];

    /// Key used in result files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::BlindSpotMonitor => "adas_blind_spot_monitor",
            Self::WindshieldCamera => "adas_windshield_camera",
            Self::FrontRadar => "adas_front_radar",
            Self::SurroundCamera => "adas_360_camera",
        }
    }
}

impl fmt::Display for SystemSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Rule for the optional engine / body-style step some makes insert before
/// the system panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleConfigRule {
    /// Regex patterns tried in order; the first pattern matching any
    /// available option selects that option.
    #[serde(default)]
    pub preferences: Vec<String>,

    /// Pick the first available option when no preference matches.
    #[serde(default = "default_fallback_first")]
    pub fallback_first: bool,
}

fn default_fallback_first() -> bool {
    true
}

/// A manufacturer row of the classification table.
///
/// Immutable once the catalogue is loaded; every manufacturer-specific
/// behaviour of the engine is driven from these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Canonical name (`MERCEDES-BENZ`).
    pub name: String,

    /// Label of the make on the site (`Mercedes-Benz`).
    pub site_name: String,

    /// Alternative site labels tried after `site_name`.
    #[serde(default)]
    pub site_aliases: Vec<String>,

    /// Year axis encoding for most models of this make.
    pub year_encoding: YearEncoding,

    /// Per-model encoding overrides keyed by model label.
    #[serde(default)]
    pub model_encodings: BTreeMap<String, YearEncoding>,

    /// Region tags in preference order (lower index wins).
    #[serde(default)]
    pub region_preference: Vec<String>,

    /// Region tags whose models are dropped entirely.
    #[serde(default)]
    pub excluded_regions: Vec<String>,

    /// When non-empty, keep only model labels containing one of these tags.
    #[serde(default)]
    pub required_model_tags: Vec<String>,

    /// Drop model labels containing a parenthesized segment.
    #[serde(default)]
    pub exclude_parenthesized: bool,

    /// Drop model labels containing any of these words.
    #[serde(default)]
    pub banned_keywords: Vec<String>,

    /// Present when the make inserts a vehicle configuration step.
    #[serde(default)]
    pub vehicle_config: Option<VehicleConfigRule>,

    /// Site option names to try for each system slot, in order.
    #[serde(default)]
    pub system_aliases: BTreeMap<SystemSlot, Vec<String>>,
}

impl Manufacturer {
    /// Labels to try when selecting the make, primary first.
    pub fn site_labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.site_name.as_str()).chain(self.site_aliases.iter().map(String::as_str))
    }

    /// Encoding used for one specific model.
    pub fn encoding_for(&self, model_label: &str) -> YearEncoding {
        self.model_encodings
            .get(model_label)
            .copied()
            .unwrap_or(self.year_encoding)
    }

    /// Whether the make needs a vehicle configuration step.
    pub fn requires_vehicle_config(&self) -> bool {
        self.vehicle_config.is_some()
    }

    /// Site option aliases for a slot.
    pub fn aliases_for(&self, slot: SystemSlot) -> &[String] {
        self.system_aliases
            .get(&slot)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A model label as listed on the site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelEntry {
    pub manufacturer: String,
    pub label: String,
}

impl ModelEntry {
    pub fn new(manufacturer: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            label: label.into(),
        }
    }

    /// Region tag of the label: the first parenthesized segment that is not a
    /// year expression. `"RAV4 (USA)"` gives `Some("USA")`.
    pub fn region(&self) -> Option<&str> {
        parenthesized_segments(&self.label)
            .find(|segment| !contains_year(segment))
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
    }

    /// Label with every parenthesized segment removed.
    pub fn base_label(&self) -> String {
        let mut base = String::with_capacity(self.label.len());
        let mut depth = 0usize;
        for c in self.label.chars() {
            match c {
                '(' => depth += 1,
                ')' if depth > 0 => depth -= 1,
                _ if depth == 0 => base.push(c),
                _ => {}
            }
        }
        base.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn parenthesized_segments(label: &str) -> impl Iterator<Item = &str> {
    label.split('(').skip(1).filter_map(|rest| rest.split(')').next())
}

fn contains_year(segment: &str) -> bool {
    let digits: Vec<char> = segment.chars().collect();
    digits
        .windows(4)
        .any(|w| w.iter().all(char::is_ascii_digit) && (w[0] == '1' || w[0] == '2'))
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenOrigin {
    /// Listed as a selectable option in the year panel.
    Panel,
    /// Derived from a year range embedded in the model label; no year step.
    ModelLabel,
    /// Stands for the whole model of a make without a year axis.
    WholeModel,
}

/// Ordering key for descending-recency sort.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SortKey {
    /// Tokens without any year sort after every dated token.
    Raw(String),
    Year(u16),
}

/// A classified year / chassis / designation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOrChassisToken {
    pub raw: String,
    pub kind: YearEncoding,
    pub sort_key: SortKey,
    pub origin: TokenOrigin,
}

impl YearOrChassisToken {
    /// The token standing for a whole model without a year axis.
    pub fn whole_model() -> Self {
        Self {
            raw: WHOLE_MODEL_TOKEN.to_string(),
            kind: YearEncoding::NoYear,
            sort_key: SortKey::Raw(WHOLE_MODEL_TOKEN.to_string()),
            origin: TokenOrigin::WholeModel,
        }
    }

    /// Whether selecting this token requires a year panel click.
    pub fn needs_year_step(&self) -> bool {
        self.origin == TokenOrigin::Panel
    }
}

impl fmt::Display for YearOrChassisToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
#[path = "manufacturer_tests.rs"]
mod tests;
