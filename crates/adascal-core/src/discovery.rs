//! Model, token and system discovery on the live site.

use std::collections::BTreeMap;

use adascal_protocols::{
    Manufacturer, PageDriver, ScrapeError, SystemSlot, YearEncoding, YearOrChassisToken,
};
use tracing::{debug, info};

use crate::automaton::Navigator;
use crate::resolver::Panel;
use crate::rules::{classify_tokens, filter_models, token_from_model_label};

/// Models offered for a make, after inclusion rules and region
/// de-duplication.
pub async fn discover_models(
    navigator: &Navigator,
    page: &dyn PageDriver,
    manufacturer: &Manufacturer,
) -> Result<Vec<String>, ScrapeError> {
    navigator.navigate_to_make(page, manufacturer).await?;
    let labels = navigator.list_options(page, Panel::Model).await?;
    let models = filter_models(manufacturer, &labels);
    info!(
        "{}: {} models listed, {} kept",
        manufacturer.name,
        labels.len(),
        models.len()
    );
    Ok(models)
}

/// Tokens for one model, most recent first.
///
/// Makes without a year axis get the single whole-model token and no page
/// is touched. Designation-encoded models with an empty year panel fall
/// back to a year range written in the model label.
pub async fn discover_tokens(
    navigator: &Navigator,
    page: &dyn PageDriver,
    manufacturer: &Manufacturer,
    model: &str,
) -> Result<Vec<YearOrChassisToken>, ScrapeError> {
    let encoding = manufacturer.encoding_for(model);
    if encoding == YearEncoding::NoYear {
        return Ok(vec![YearOrChassisToken::whole_model()]);
    }

    navigator.navigate_to_model(page, manufacturer, model).await?;
    let raws = if navigator.is_panel_shown(page, Panel::Year).await? {
        navigator.list_options(page, Panel::Year).await?
    } else {
        Vec::new()
    };

    let mut tokens = classify_tokens(manufacturer, model, &raws);
    if tokens.is_empty() && encoding == YearEncoding::ModelDesignation {
        tokens.extend(token_from_model_label(model));
    }
    debug!(
        "{} {}: {} raw options, {} tokens",
        manufacturer.name,
        model,
        raws.len(),
        tokens.len()
    );
    Ok(tokens)
}

/// System options offered for the current selection. Leaves the panel
/// closed.
pub async fn discover_systems(
    navigator: &Navigator,
    page: &dyn PageDriver,
) -> Result<Vec<String>, ScrapeError> {
    let systems = navigator.list_options(page, Panel::System).await?;
    navigator.dismiss(page).await?;
    Ok(systems)
}

/// Map each slot to the site option of its first matching alias. An alias
/// matches an option exactly (ignoring case) or when either contains the
/// other. Unmapped slots are absent.
pub fn map_systems(manufacturer: &Manufacturer, available: &[String]) -> BTreeMap<SystemSlot, String> {
    let options: Vec<(String, &String)> = available
        .iter()
        .map(|option| (option.to_lowercase(), option))
        .collect();
    let mut mapped = BTreeMap::new();

    for slot in SystemSlot::ALL {
        for alias in manufacturer.aliases_for(slot) {
            let alias = alias.to_lowercase();
            let found = options
                .iter()
                .find(|(lower, _)| *lower == alias)
                .or_else(|| {
                    options
                        .iter()
                        .find(|(lower, _)| lower.contains(&alias) || alias.contains(lower.as_str()))
                });
            if let Some((_, option)) = found {
                mapped.insert(slot, (*option).clone());
                break;
            }
        }
    }
    mapped
}
