//! Manufacturer classification rules.
//!
//! Pure functions over a [`Manufacturer`] row. Every manufacturer-specific
//! decision about tokens and model labels is made here from table data.

use std::collections::{HashMap, HashSet};

use adascal_protocols::{
    Manufacturer, ModelEntry, SortKey, TokenOrigin, YearEncoding, YearOrChassisToken,
};
use once_cell::sync::Lazy;
use regex::Regex;

static PLAIN_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(19|20)\d{2}(\s*\([A-Z]\))?$").expect("valid regex"));

static CHASSIS_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]\d{2}$").expect("valid regex"));

static MODEL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid regex"));

static DESIGNATION: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        // 2017-2023, 2017~2023
        Regex::new(r"^(19|20)\d{2}\s*[-~]\s*(19|20)\d{2}$").expect("valid regex"),
        // 2019, 2019>, 2021~, 2021-
        Regex::new(r"^(19|20)\d{2}[>~-]?$").expect("valid regex"),
        // ~2020, <2020, -2020
        Regex::new(r"^[~<-](19|20)\d{2}$").expect("valid regex"),
        // Golf (2015-2020)
        Regex::new(r"^.*\((19|20)\d{2}.*\)$").expect("valid regex"),
    ]
});

/// A designation embedded somewhere inside a model label.
static EMBEDDED_DESIGNATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(19|20)\d{2}\s*[-~]\s*(19|20)\d{2}|(19|20)\d{2}\s*[>~]|[~<]\s*(19|20)\d{2}|(19|20)\d{2}\s*-")
        .expect("valid regex")
});

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").expect("valid regex"));

pub fn year_encoding_kind(manufacturer: &Manufacturer) -> YearEncoding {
    manufacturer.year_encoding
}

/// Whether `raw` is a valid token of the given encoding.
pub fn matches_encoding(kind: YearEncoding, raw: &str) -> bool {
    let raw = raw.trim();
    match kind {
        YearEncoding::PlainYear => PLAIN_YEAR.is_match(raw),
        YearEncoding::ChassisCode => CHASSIS_CODE.is_match(raw),
        YearEncoding::ModelCode => MODEL_CODE.is_match(raw),
        YearEncoding::ModelDesignation => DESIGNATION.iter().any(|re| re.is_match(raw)),
        YearEncoding::NoYear => false,
    }
}

/// Token check against the manufacturer's default encoding.
pub fn is_acceptable_token(manufacturer: &Manufacturer, raw: &str) -> bool {
    matches_encoding(manufacturer.year_encoding, raw)
}

/// Token check honouring per-model encoding overrides.
pub fn is_acceptable_token_for(manufacturer: &Manufacturer, model: &str, raw: &str) -> bool {
    matches_encoding(manufacturer.encoding_for(model), raw)
}

/// Descending-recency key. Dated tokens use the latest year they mention,
/// so `2017-2023` sorts as 2023. Chassis and model codes sort by raw text.
pub fn sort_key(kind: YearEncoding, raw: &str) -> SortKey {
    match kind {
        YearEncoding::PlainYear | YearEncoding::ModelDesignation => latest_year(raw)
            .map(SortKey::Year)
            .unwrap_or_else(|| SortKey::Raw(raw.to_string())),
        _ => SortKey::Raw(raw.to_string()),
    }
}

fn latest_year(raw: &str) -> Option<u16> {
    YEAR.find_iter(raw)
        .filter_map(|m| m.as_str().parse::<u16>().ok())
        .max()
}

/// Classify one raw label for a model. `None` when it matches no pattern.
pub fn classify(manufacturer: &Manufacturer, model: &str, raw: &str) -> Option<YearOrChassisToken> {
    let kind = manufacturer.encoding_for(model);
    let raw = raw.trim();
    matches_encoding(kind, raw).then(|| YearOrChassisToken {
        raw: raw.to_string(),
        kind,
        sort_key: sort_key(kind, raw),
        origin: TokenOrigin::Panel,
    })
}

/// Keep acceptable tokens, drop duplicates and sort most recent first.
///
/// Idempotent: classifying the raw values of the output again yields the
/// same list.
pub fn classify_tokens<S: AsRef<str>>(
    manufacturer: &Manufacturer,
    model: &str,
    raws: &[S],
) -> Vec<YearOrChassisToken> {
    let mut seen = HashSet::new();
    let mut tokens: Vec<YearOrChassisToken> = raws
        .iter()
        .filter_map(|raw| classify(manufacturer, model, raw.as_ref()))
        .filter(|token| seen.insert(token.raw.clone()))
        .collect();
    tokens.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
    tokens
}

/// Every year mentioned in a model label, most recent first.
pub fn extract_years_from_model(label: &str) -> Vec<String> {
    let mut years: Vec<u16> = YEAR
        .find_iter(label)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years.into_iter().map(|y| y.to_string()).collect()
}

/// Token derived from a year range written into the model label, used when
/// a designation-encoded model offers nothing in the year panel.
pub fn token_from_model_label(label: &str) -> Option<YearOrChassisToken> {
    let raw = match EMBEDDED_DESIGNATION.find(label) {
        Some(m) => m.as_str().split_whitespace().collect::<String>(),
        None => extract_years_from_model(label).into_iter().next()?,
    };
    let kind = YearEncoding::ModelDesignation;
    matches_encoding(kind, &raw).then(|| YearOrChassisToken {
        sort_key: sort_key(kind, &raw),
        raw,
        kind,
        origin: TokenOrigin::ModelLabel,
    })
}

/// Rank of a model label by region. Lower is preferred; `None` means the
/// label names an excluded region and must be dropped.
///
/// Labels without a region tag rank 0, preferred regions rank by position
/// starting at 1, and any other region ranks after every preferred one.
pub fn region_rank(manufacturer: &Manufacturer, label: &str) -> Option<usize> {
    let entry = ModelEntry::new(&manufacturer.name, label);
    let Some(region) = entry.region() else {
        return Some(0);
    };
    if manufacturer
        .excluded_regions
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(region))
    {
        return None;
    }
    let rank = manufacturer
        .region_preference
        .iter()
        .position(|preferred| preferred.eq_ignore_ascii_case(region))
        .map(|index| index + 1)
        .unwrap_or(manufacturer.region_preference.len() + 1);
    Some(rank)
}

fn words(label: &str) -> impl Iterator<Item = String> + '_ {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase)
}

/// Inclusion rules for a model label, before region de-duplication.
pub fn is_model_included(manufacturer: &Manufacturer, label: &str) -> bool {
    let label = label.trim();
    if label.chars().count() < 2 || !label.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return false;
    }
    if words(label).any(|word| {
        manufacturer
            .banned_keywords
            .iter()
            .any(|banned| banned.eq_ignore_ascii_case(&word))
    }) {
        return false;
    }
    if !manufacturer.required_model_tags.is_empty()
        && !manufacturer
            .required_model_tags
            .iter()
            .any(|tag| label.contains(tag.as_str()))
    {
        return false;
    }
    if manufacturer.exclude_parenthesized && label.contains('(') && label.contains(')') {
        return false;
    }
    region_rank(manufacturer, label).is_some()
}

/// Label with its region tag removed; two labels sharing a key are the same
/// vehicle listed for different regions.
fn region_key(manufacturer: &Manufacturer, label: &str) -> String {
    let entry = ModelEntry::new(&manufacturer.name, label);
    let stripped = match entry.region() {
        Some(region) => {
            let start = label.find(region).unwrap_or(0);
            let open = label[..start].rfind('(').unwrap_or(start);
            let close = label[start..]
                .find(')')
                .map(|i| start + i + 1)
                .unwrap_or(label.len());
            format!("{}{}", &label[..open], &label[close..])
        }
        None => label.to_string(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply the inclusion rules, then keep the best-ranked label of every
/// region duplicate. Output follows the first appearance of each vehicle.
pub fn filter_models<S: AsRef<str>>(manufacturer: &Manufacturer, labels: &[S]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (usize, String)> = HashMap::new();

    for label in labels.iter().map(|l| l.as_ref().trim()) {
        if !is_model_included(manufacturer, label) {
            continue;
        }
        let Some(rank) = region_rank(manufacturer, label) else {
            continue;
        };
        let key = region_key(manufacturer, label);
        match best.get(&key) {
            Some((existing, _)) if *existing <= rank => {}
            Some(_) => {
                best.insert(key, (rank, label.to_string()));
            }
            None => {
                order.push(key.clone());
                best.insert(key, (rank, label.to_string()));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| best.remove(&key).map(|(_, label)| label))
        .collect()
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
