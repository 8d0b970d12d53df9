//! The four resolution strategies.

use std::fmt;

use adascal_protocols::{DriverError, ElementHandle, PageDriver};

use super::{ResolverSettings, Target};

/// Resolution strategies in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Exact text, scoped to the expected container.
    StructuralExact,
    /// Exact text anywhere visible.
    ExactVisible,
    /// Case-insensitive substring of a short visible text.
    Contains,
    /// Exact text of a text node's parent, walking the whole document.
    TextWalk,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::StructuralExact,
        Strategy::ExactVisible,
        Strategy::Contains,
        Strategy::TextWalk,
    ];

    pub(super) fn index(&self) -> usize {
        match self {
            Self::StructuralExact => 0,
            Self::ExactVisible => 1,
            Self::Contains => 2,
            Self::TextWalk => 3,
        }
    }

    /// One lookup attempt.
    pub(super) async fn find(
        &self,
        page: &dyn PageDriver,
        target: &Target,
        settings: &ResolverSettings,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let wanted = target.text();
        let elements = match (self, target) {
            (Self::StructuralExact, Target::Option { panel, .. }) => {
                page.query_all(&panel.config(&settings.panels).option_selector())
                    .await?
            }
            (Self::StructuralExact, Target::Input { placeholder }) => {
                return first_visible(page.query_all(&input_selector(placeholder)).await?, |_| true);
            }
            (Self::StructuralExact, Target::Indicator { .. }) => {
                page.query_all(&settings.indicators).await?
            }
            (Self::ExactVisible | Self::Contains, Target::Input { placeholder }) => {
                let exact = matches!(self, Self::ExactVisible);
                let wanted = placeholder.to_lowercase();
                return first_visible(page.query_all("input").await?, |e| {
                    let actual = e.attr("placeholder").unwrap_or_default();
                    if exact {
                        actual == placeholder
                    } else {
                        actual.to_lowercase().contains(&wanted)
                    }
                });
            }
            (Self::ExactVisible, _) => page.query_all(&settings.candidates).await?,
            (Self::Contains, _) => {
                let wanted = wanted.to_lowercase();
                let max_len = settings.max_contains_len;
                return first_visible(page.query_all(&settings.candidates).await?, |e| {
                    e.text.chars().count() <= max_len && e.text.to_lowercase().contains(&wanted)
                });
            }
            (Self::TextWalk, _) => page.text_node_parents().await?,
        };
        first_visible(elements, |e| e.text == wanted)
    }
}

fn first_visible(
    elements: Vec<ElementHandle>,
    predicate: impl Fn(&ElementHandle) -> bool,
) -> Result<Option<ElementHandle>, DriverError> {
    Ok(elements
        .into_iter()
        .find(|e| e.is_visible() && predicate(e)))
}

pub(crate) fn input_selector(placeholder: &str) -> String {
    format!("input[placeholder=\"{}\"]", placeholder.replace('"', "\\\""))
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StructuralExact => "structural_exact",
            Self::ExactVisible => "exact_visible",
            Self::Contains => "contains",
            Self::TextWalk => "text_walk",
        };
        f.write_str(name)
    }
}
