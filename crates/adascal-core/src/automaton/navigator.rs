use std::sync::Arc;

use adascal_config::{Config, SiteConfig, TimeoutConfig};
use adascal_protocols::{
    DriverError, Manufacturer, PageDriver, ScrapeError, VehicleConfigRule, YearOrChassisToken,
};
use regex::RegexBuilder;
use tracing::{debug, info, warn};

use super::{NavState, NavigationTrace, Transition, TRANSITION_ATTEMPTS};
use crate::resolver::{ElementResolver, Panel, Strategy, Target};

enum Attempt {
    Advanced { label: String, strategy: Strategy },
    NotFound,
    NoMarker(String),
}

/// Stateless driver of the selector cascade. All navigation state lives in
/// the [`NavigationTrace`] passed through each call.
pub struct Navigator {
    resolver: Arc<ElementResolver>,
    site: SiteConfig,
    timeouts: TimeoutConfig,
}

impl Navigator {
    pub fn new(resolver: Arc<ElementResolver>, config: &Config) -> Self {
        Self {
            resolver,
            site: config.site.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    pub fn resolver(&self) -> &Arc<ElementResolver> {
        &self.resolver
    }

    /// Load the site and select product type and make.
    pub async fn navigate_to_make(
        &self,
        page: &dyn PageDriver,
        manufacturer: &Manufacturer,
    ) -> Result<NavigationTrace, ScrapeError> {
        page.open(&self.site.url).await?;
        let mut trace = NavigationTrace::new();
        self.select_product_type(page, &mut trace).await?;
        self.select_make(page, &mut trace, manufacturer).await?;
        Ok(trace)
    }

    pub async fn navigate_to_model(
        &self,
        page: &dyn PageDriver,
        manufacturer: &Manufacturer,
        model: &str,
    ) -> Result<NavigationTrace, ScrapeError> {
        let mut trace = self.navigate_to_make(page, manufacturer).await?;
        self.select_model(page, &mut trace, model).await?;
        Ok(trace)
    }

    /// Drive a fresh page up to the point where systems can be selected.
    pub async fn navigate_to_token(
        &self,
        page: &dyn PageDriver,
        manufacturer: &Manufacturer,
        model: &str,
        token: &YearOrChassisToken,
    ) -> Result<NavigationTrace, ScrapeError> {
        let mut trace = self.navigate_to_model(page, manufacturer, model).await?;
        self.select_token(page, &mut trace, token).await?;
        self.select_vehicle_config(page, &mut trace, manufacturer)
            .await?;
        Ok(trace)
    }

    pub async fn select_product_type(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
    ) -> Result<(), ScrapeError> {
        let labels = [self.site.product_type.clone()];
        let marker = self.panel_marker(Panel::Make);
        self.advance(page, trace, NavState::ProductTypeSelected, Panel::ProductType, &labels, &marker)
            .await
            .map(drop)
    }

    /// Select the make by its site name, then each alias in turn.
    pub async fn select_make(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        manufacturer: &Manufacturer,
    ) -> Result<(), ScrapeError> {
        let labels: Vec<String> = manufacturer.site_labels().map(str::to_string).collect();
        let marker = self.panel_marker(Panel::Model);
        self.advance(page, trace, NavState::MakeSelected, Panel::Make, &labels, &marker)
            .await
            .map(drop)
    }

    /// Select a model. The next panel may be the year list, the vehicle
    /// configuration step or the system panel.
    pub async fn select_model(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        model: &str,
    ) -> Result<(), ScrapeError> {
        let labels = [model.to_string()];
        let marker = self.markers(&[Panel::Year, Panel::VehicleConfig, Panel::System]);
        self.advance(page, trace, NavState::ModelSelected, Panel::Model, &labels, &marker)
            .await
            .map(drop)
    }

    /// Select a year or chassis token. Tokens that stand for the whole model
    /// or come from the model label enter `YearSelected` without a click.
    pub async fn select_token(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        token: &YearOrChassisToken,
    ) -> Result<(), ScrapeError> {
        if !token.needs_year_step() {
            trace.enter(NavState::YearSelected);
            return Ok(());
        }
        let labels = [token.raw.clone()];
        let marker = self.markers(&[Panel::VehicleConfig, Panel::System]);
        self.advance(page, trace, NavState::YearSelected, Panel::Year, &labels, &marker)
            .await
            .map(drop)
    }

    /// The optional engine / body style step. Returns the chosen option, or
    /// `None` when the make has no such step or the site did not show it.
    pub async fn select_vehicle_config(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        manufacturer: &Manufacturer,
    ) -> Result<Option<String>, ScrapeError> {
        let Some(rule) = &manufacturer.vehicle_config else {
            return Ok(None);
        };
        let Some(input) = Panel::VehicleConfig.config(&self.site.panels).input_selector() else {
            return Ok(None);
        };
        if page
            .wait_for_visible(&input, self.timeouts.panel_open(), self.timeouts.poll_interval())
            .await?
            .is_none()
        {
            debug!("No vehicle configuration step shown for {}", manufacturer.name);
            return Ok(None);
        }

        let options = self.list_options(page, Panel::VehicleConfig).await?;
        let choice = choose_vehicle_config(rule, &options).ok_or_else(|| {
            ScrapeError::transition(
                trace.current().to_string(),
                "vehicle configuration",
                format!("no option matches among {:?}", options),
            )
        })?;
        info!("Vehicle configuration for {}: {}", manufacturer.name, choice);

        let marker = self.panel_marker(Panel::System);
        self.advance(
            page,
            trace,
            NavState::VehicleConfigSelected,
            Panel::VehicleConfig,
            &[choice],
            &marker,
        )
        .await
        .map(Some)
    }

    /// Select a system option and wait for the result panel.
    pub async fn select_system(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        label: &str,
    ) -> Result<(), ScrapeError> {
        let labels = [label.to_string()];
        let marker = self.site.result_markers.join(", ");
        self.advance(page, trace, NavState::SystemSelected, Panel::System, &labels, &marker)
            .await
            .map(drop)
    }

    /// Visible option labels of a panel, opening it first. Order follows
    /// the page; duplicates are dropped.
    pub async fn list_options(
        &self,
        page: &dyn PageDriver,
        panel: Panel,
    ) -> Result<Vec<String>, DriverError> {
        self.open_panel(page, panel, false).await?;
        let selector = panel.config(&self.site.panels).option_selector();
        let mut labels: Vec<String> = Vec::new();
        for element in page.query_all(&selector).await? {
            let text = element.text.trim();
            if element.is_visible() && !text.is_empty() && !labels.iter().any(|l| l == text) {
                labels.push(text.to_string());
            }
        }
        debug!("{} panel lists {} options", panel, labels.len());
        Ok(labels)
    }

    /// Whether a panel's input or options are currently visible.
    pub async fn is_panel_shown(&self, page: &dyn PageDriver, panel: Panel) -> Result<bool, DriverError> {
        let config = panel.config(&self.site.panels);
        let selector = match config.input_selector() {
            Some(input) => format!("{}, {}", input, config.option_selector()),
            None => config.option_selector(),
        };
        Ok(page.query_all(&selector).await?.iter().any(|e| e.is_visible()))
    }

    /// Close any open dropdown.
    pub async fn dismiss(&self, page: &dyn PageDriver) -> Result<(), DriverError> {
        page.press_key(&self.site.dismiss_key).await?;
        tokio::time::sleep(self.timeouts.settle()).await;
        Ok(())
    }

    async fn advance(
        &self,
        page: &dyn PageDriver,
        trace: &mut NavigationTrace,
        to: NavState,
        panel: Panel,
        labels: &[String],
        marker: &str,
    ) -> Result<String, ScrapeError> {
        let from = trace.current();
        let mut reason = String::new();

        for attempt in 1..=TRANSITION_ATTEMPTS {
            match self.attempt(page, panel, labels, marker, attempt > 1).await {
                Ok(Attempt::Advanced { label, strategy }) => {
                    debug!("{} -> {} via '{}' ({})", from, to, label, strategy);
                    trace.record(Transition {
                        from,
                        to,
                        target: label.clone(),
                        strategy,
                        attempts: attempt,
                    });
                    return Ok(label);
                }
                Ok(Attempt::NotFound) => {
                    reason = format!("no visible option in {} panel", panel);
                }
                Ok(Attempt::NoMarker(label)) => {
                    reason = format!("clicked '{}' but the next panel never appeared", label);
                }
                Err(DriverError::Closed) => return Err(DriverError::Closed.into()),
                Err(e) => reason = e.to_string(),
            }
            if attempt < TRANSITION_ATTEMPTS {
                warn!("{} -> {} attempt {} failed: {}; retrying", from, to, attempt, reason);
            }
        }

        Err(ScrapeError::transition(from.to_string(), labels.join("|"), reason))
    }

    async fn attempt(
        &self,
        page: &dyn PageDriver,
        panel: Panel,
        labels: &[String],
        marker: &str,
        force_open: bool,
    ) -> Result<Attempt, DriverError> {
        self.open_panel(page, panel, force_open).await?;

        let mut found = None;
        for label in labels {
            if let Some(resolved) = self.resolver.resolve(page, &Target::option(panel, label)).await? {
                found = Some((label.clone(), resolved));
                break;
            }
        }
        let Some((label, resolved)) = found else {
            return Ok(Attempt::NotFound);
        };

        page.click(&resolved.element).await?;
        let shown = page
            .wait_for_visible(marker, self.timeouts.marker_wait(), self.timeouts.poll_interval())
            .await?;
        Ok(match shown {
            Some(_) => Attempt::Advanced {
                label,
                strategy: resolved.strategy,
            },
            None => Attempt::NoMarker(label),
        })
    }

    /// Click the panel's input unless its options are already showing.
    /// Panels without an input open by themselves.
    async fn open_panel(
        &self,
        page: &dyn PageDriver,
        panel: Panel,
        force: bool,
    ) -> Result<(), DriverError> {
        let config = panel.config(&self.site.panels);
        let Some(placeholder) = &config.input else {
            return Ok(());
        };
        let options = config.option_selector();
        if !force
            && page
                .query_all(&options)
                .await?
                .iter()
                .any(|e| e.is_visible())
        {
            return Ok(());
        }
        let Some(input) = self.resolver.resolve(page, &Target::input(placeholder)).await? else {
            debug!("{} panel input '{}' not found", panel, placeholder);
            return Ok(());
        };
        page.click(&input.element).await?;
        page.wait_for_visible(&options, self.timeouts.panel_open(), self.timeouts.poll_interval())
            .await?;
        Ok(())
    }

    fn panel_marker(&self, panel: Panel) -> String {
        let config = panel.config(&self.site.panels);
        config
            .input_selector()
            .unwrap_or_else(|| config.option_selector())
    }

    fn markers(&self, panels: &[Panel]) -> String {
        panels
            .iter()
            .map(|panel| self.panel_marker(*panel))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Pick a vehicle configuration option: the first preference pattern that
/// matches any option wins, otherwise the first option if allowed.
pub fn choose_vehicle_config(rule: &VehicleConfigRule, options: &[String]) -> Option<String> {
    for pattern in &rule.preferences {
        let re = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                warn!("Ignoring invalid vehicle configuration pattern '{}': {}", pattern, e);
                continue;
            }
        };
        if let Some(option) = options.iter().find(|option| re.is_match(option)) {
            return Some(option.clone());
        }
    }
    if rule.fallback_first {
        options.first().cloned()
    } else {
        None
    }
}
