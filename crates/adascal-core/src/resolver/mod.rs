//! Element resolution by semantic target.
//!
//! A [`Target`] names what the engine wants ("option `X5` in the model
//! panel"); the resolver translates it into concrete queries and tries the
//! [`Strategy`] list in a fixed order. Each strategy is a bounded poll with
//! its own budget. The first visible match of the first successful strategy
//! wins.

mod strategy;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use adascal_config::{Config, PanelConfig, PanelsConfig};
use adascal_protocols::{DriverError, ElementHandle, PageDriver};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::diagnostics::DebugCapture;

pub use strategy::Strategy;

/// A selector panel of the cascading UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    ProductType,
    Make,
    Model,
    Year,
    VehicleConfig,
    System,
}

impl Panel {
    pub fn config<'a>(&self, panels: &'a PanelsConfig) -> &'a PanelConfig {
        match self {
            Self::ProductType => &panels.product_type,
            Self::Make => &panels.make,
            Self::Model => &panels.model,
            Self::Year => &panels.year,
            Self::VehicleConfig => &panels.vehicle_config,
            Self::System => &panels.system,
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProductType => "product_type",
            Self::Make => "make",
            Self::Model => "model",
            Self::Year => "year",
            Self::VehicleConfig => "vehicle_config",
            Self::System => "system",
        };
        f.write_str(name)
    }
}

/// What to find. Never a literal selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Option with exact visible text inside a panel.
    Option { panel: Panel, text: String },
    /// Input identified by its placeholder.
    Input { placeholder: String },
    /// Calibration indicator label on the result panel.
    Indicator { text: String },
}

impl Target {
    pub fn option(panel: Panel, text: impl Into<String>) -> Self {
        Self::Option {
            panel,
            text: text.into(),
        }
    }

    pub fn input(placeholder: impl Into<String>) -> Self {
        Self::Input {
            placeholder: placeholder.into(),
        }
    }

    pub fn indicator(text: impl Into<String>) -> Self {
        Self::Indicator { text: text.into() }
    }

    /// Text the target is matched against.
    pub fn text(&self) -> &str {
        match self {
            Self::Option { text, .. } | Self::Indicator { text } => text,
            Self::Input { placeholder } => placeholder,
        }
    }

    /// Step name used for diagnostic artifacts.
    pub fn step_name(&self) -> String {
        match self {
            Self::Option { panel, text } => format!("{}_{}", panel, text),
            Self::Input { placeholder } => format!("input_{}", placeholder),
            Self::Indicator { text } => format!("indicator_{}", text),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Option { panel, text } => write!(f, "option '{}' in {} panel", text, panel),
            Self::Input { placeholder } => write!(f, "input '{}'", placeholder),
            Self::Indicator { text } => write!(f, "indicator '{}'", text),
        }
    }
}

/// A resolved element and the strategy that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub element: ElementHandle,
    pub strategy: Strategy,
}

/// Queries and budgets the strategies work from.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub panels: PanelsConfig,
    /// Elements considered by the document-wide strategies.
    pub candidates: String,
    pub max_contains_len: usize,
    /// Elements that may carry a calibration indicator.
    pub indicators: String,
    pub budgets: [Duration; 4],
    pub probe_budget: Duration,
    pub poll: Duration,
}

impl ResolverSettings {
    pub fn from_config(config: &Config) -> Self {
        let t = &config.timeouts;
        Self {
            panels: config.site.panels.clone(),
            candidates: config.resolver.candidate_selectors.join(", "),
            max_contains_len: config.resolver.max_contains_len,
            indicators: config.extractor.indicator_selectors.join(", "),
            budgets: [
                Duration::from_millis(t.structural_ms),
                Duration::from_millis(t.exact_ms),
                Duration::from_millis(t.contains_ms),
                Duration::from_millis(t.text_walk_ms),
            ],
            probe_budget: t.indicator_probe(),
            poll: t.poll_interval(),
        }
    }

    fn budget(&self, strategy: Strategy) -> Duration {
        self.budgets[strategy.index()]
    }
}

/// Ordered-fallback element resolver.
pub struct ElementResolver {
    settings: ResolverSettings,
    capture: Option<Arc<DebugCapture>>,
}

impl ElementResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            capture: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ResolverSettings::from_config(config))
    }

    /// Write a screenshot and DOM dump whenever a target is not found.
    pub fn with_debug_capture(mut self, capture: Arc<DebugCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve with the configured per-strategy budgets. On total failure a
    /// diagnostic capture is taken and `None` returned.
    ///
    /// Only [`DriverError::Closed`] is returned as an error; other driver
    /// errors count as a miss for that poll.
    pub async fn resolve(
        &self,
        page: &dyn PageDriver,
        target: &Target,
    ) -> Result<Option<Resolved>, DriverError> {
        let found = self
            .run_strategies(page, target, |strategy| self.settings.budget(strategy))
            .await?;
        if found.is_none() {
            debug!("Could not resolve {}", target);
            if let Some(capture) = &self.capture {
                capture.capture(page, &target.step_name()).await;
            }
        }
        Ok(found)
    }

    /// Resolve with the short indicator budget for every strategy and no
    /// diagnostic capture. Used for presence checks.
    pub async fn probe(
        &self,
        page: &dyn PageDriver,
        target: &Target,
    ) -> Result<Option<Resolved>, DriverError> {
        let budget = self.settings.probe_budget;
        self.run_strategies(page, target, |_| budget).await
    }

    async fn run_strategies(
        &self,
        page: &dyn PageDriver,
        target: &Target,
        budget: impl Fn(Strategy) -> Duration,
    ) -> Result<Option<Resolved>, DriverError> {
        for strategy in Strategy::ORDER {
            if let Some(element) = self.poll(page, target, strategy, budget(strategy)).await? {
                debug!("Resolved {} via {}", target, strategy);
                return Ok(Some(Resolved { element, strategy }));
            }
        }
        Ok(None)
    }

    async fn poll(
        &self,
        page: &dyn PageDriver,
        target: &Target,
        strategy: Strategy,
        budget: Duration,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let deadline = Instant::now() + budget;
        loop {
            match strategy.find(page, target, &self.settings).await {
                Ok(Some(element)) => return Ok(Some(element)),
                Ok(None) => {}
                Err(DriverError::Closed) => return Err(DriverError::Closed),
                Err(e) => warn!("{} lookup for {} failed: {}", strategy, target, e),
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.settings.poll).await;
        }
    }
}
