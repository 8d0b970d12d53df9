//! In-memory pages for engine tests.
//!
//! [`StaticDom`] serves a fixed node list. [`SiteDom`] simulates the
//! cascading selector site: panels open and close as options are clicked,
//! and a result panel renders for the selected system.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use adascal_config::{Config, PanelsConfig};
use adascal_protocols::{
    BrowserContext, BrowserProvider, DriverError, ElementHandle, Manufacturer, PageDriver, Rect,
    SystemSlot, VehicleConfigRule, YearEncoding,
};
use async_trait::async_trait;
use serde_json::Value;

use crate::resolver::Panel;

/// What happens when a node is clicked.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    OpenPanel(Panel),
    Select(Panel, String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub tag: String,
    pub text: String,
    pub selectors: Vec<String>,
    pub visible: bool,
    pub attrs: HashMap<String, String>,
    pub size: (f64, f64),
    pub action: Action,
}

impl Node {
    pub fn new(id: &str, tag: &str, text: &str, selectors: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            text: text.to_string(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            visible: true,
            attrs: HashMap::new(),
            size: (100.0, 20.0),
            action: Action::None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }

    fn on_click(mut self, action: Action) -> Self {
        self.action = action;
        self
    }
}

pub trait Dom: Send + Sync {
    fn nodes(&self) -> Vec<Node>;
    fn activate(&self, node: &Node);
    fn press(&self, key: &str);
    fn reset(&self) {}
}

/// A fixed document that records clicks and key presses.
#[derive(Default)]
pub struct StaticDom {
    nodes: Vec<Node>,
    pub clicks: Mutex<Vec<String>>,
    pub keys: Mutex<Vec<String>>,
}

impl StaticDom {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    pub fn into_page(self) -> FixturePage<StaticDom> {
        FixturePage::new(self)
    }
}

impl Dom for StaticDom {
    fn nodes(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    fn activate(&self, node: &Node) {
        self.clicks.lock().unwrap().push(node.id.clone());
    }

    fn press(&self, key: &str) {
        self.keys.lock().unwrap().push(key.to_string());
    }
}

/// [`PageDriver`] over a [`Dom`].
///
/// Selectors are matched literally: a comma-separated selector matches
/// every node carrying one of its parts.
pub struct FixturePage<D: Dom> {
    pub dom: D,
    closed: AtomicBool,
    screenshots: Mutex<Vec<Option<String>>>,
}

impl<D: Dom> FixturePage<D> {
    pub fn new(dom: D) -> Self {
        Self {
            dom,
            closed: AtomicBool::new(false),
            screenshots: Mutex::new(Vec::new()),
        }
    }

    /// Element ids passed to `screenshot`, `None` for the viewport.
    pub fn screenshots(&self) -> Vec<Option<String>> {
        self.screenshots.lock().unwrap().clone()
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }
        Ok(())
    }

    fn handles(&self, keep: impl Fn(&Node) -> bool) -> Vec<ElementHandle> {
        self.dom
            .nodes()
            .into_iter()
            .enumerate()
            .filter(|(_, node)| keep(node))
            .map(|(index, node)| ElementHandle {
                bounds: if node.visible {
                    Rect::new(0.0, index as f64 * 24.0, node.size.0, node.size.1)
                } else {
                    Rect::default()
                },
                id: node.id,
                tag: node.tag,
                text: node.text,
                attributes: node.attrs,
                displayed: node.visible,
            })
            .collect()
    }
}

#[async_trait]
impl<D: Dom> PageDriver for FixturePage<D> {
    async fn open(&self, _url: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.dom.reset();
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        self.ensure_open()?;
        let parts: Vec<&str> = selector.split(',').map(str::trim).collect();
        Ok(self.handles(|node| node.selectors.iter().any(|s| parts.contains(&s.as_str()))))
    }

    async fn text_node_parents(&self) -> Result<Vec<ElementHandle>, DriverError> {
        self.ensure_open()?;
        Ok(self.handles(|node| !node.text.is_empty()))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.ensure_open()?;
        let node = self
            .dom
            .nodes()
            .into_iter()
            .find(|node| node.id == element.id)
            .ok_or_else(|| DriverError::StaleElement(element.id.clone()))?;
        self.dom.activate(&node);
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.dom.press(key);
        Ok(())
    }

    async fn screenshot(&self, element: Option<&ElementHandle>) -> Result<Vec<u8>, DriverError> {
        self.ensure_open()?;
        self.screenshots
            .lock()
            .unwrap()
            .push(element.map(|e| e.id.clone()));
        Ok(element
            .map(|e| e.id.clone().into_bytes())
            .unwrap_or_else(|| b"viewport".to_vec()))
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        let body: String = self
            .dom
            .nodes()
            .iter()
            .map(|n| format!("<{0} id=\"{1}\">{2}</{0}>", n.tag, n.id, n.text))
            .collect();
        Ok(format!("<html><body>{}</body></html>", body))
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        self.ensure_open()?;
        Ok(self
            .dom
            .nodes()
            .iter()
            .filter(|n| n.visible && !n.text.is_empty())
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, DriverError> {
        self.ensure_open()?;
        Ok(Value::Null)
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// Simulated site

#[derive(Debug, Clone)]
pub struct SystemSpec {
    pub label: String,
    /// Texts rendered on the result panel.
    pub texts: Vec<String>,
}

impl SystemSpec {
    pub fn new(label: &str, texts: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            texts: texts.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub label: String,
    pub tokens: Vec<String>,
    /// Clicking the model does nothing.
    pub broken: bool,
    pub systems: Vec<SystemSpec>,
}

impl ModelSpec {
    pub fn new(label: &str, tokens: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
            broken: false,
            systems: standard_systems(),
        }
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MakeSpec {
    pub label: String,
    pub models: Vec<ModelSpec>,
    pub vehicle_configs: Vec<String>,
}

impl MakeSpec {
    pub fn new(label: &str, models: Vec<ModelSpec>) -> Self {
        Self {
            label: label.to_string(),
            models,
            vehicle_configs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteSpec {
    pub product_type: String,
    pub makes: Vec<MakeSpec>,
}

impl SiteSpec {
    pub fn new(makes: Vec<MakeSpec>) -> Self {
        Self {
            product_type: "MA600".to_string(),
            makes,
        }
    }

    fn make(&self, label: &str) -> Option<&MakeSpec> {
        self.makes.iter().find(|m| m.label == label)
    }
}

/// Blind spot with a target code, a dynamic camera and a combined radar.
pub fn standard_systems() -> Vec<SystemSpec> {
    vec![
        SystemSpec::new("Blind Spot Monitor", &["Static Calibration", "Target: AUTEL-CSC0601/01"]),
        SystemSpec::new("Front Camera", &["Dynamic Calibration"]),
        SystemSpec::new("Front Radar", &["Static Calibration+Dynamic Calibration"]),
    ]
}

/// Events shared by every page opened on a [`SiteSpec`].
#[derive(Debug, Default)]
pub struct SiteLog {
    events: Mutex<Vec<String>>,
}

impl SiteLog {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e == event)
    }
}

#[derive(Debug, Default)]
struct UiState {
    product: bool,
    make: Option<String>,
    model: Option<String>,
    token: Option<String>,
    vehicle_config: Option<String>,
    system: Option<String>,
    open: Option<Panel>,
}

pub struct SiteDom {
    site: Arc<SiteSpec>,
    panels: PanelsConfig,
    log: Arc<SiteLog>,
    state: Mutex<UiState>,
}

impl SiteDom {
    pub fn new(site: Arc<SiteSpec>, log: Arc<SiteLog>) -> Self {
        Self {
            site,
            panels: PanelsConfig::default(),
            log,
            state: Mutex::new(UiState::default()),
        }
    }

    pub fn into_page(self) -> FixturePage<SiteDom> {
        FixturePage::new(self)
    }

    fn model(&self, state: &UiState) -> Option<ModelSpec> {
        let make = self.site.make(state.make.as_deref()?)?;
        make.models
            .iter()
            .find(|m| Some(m.label.as_str()) == state.model.as_deref())
            .cloned()
    }

    fn vehicle_configs(&self, state: &UiState) -> Vec<String> {
        state
            .make
            .as_deref()
            .and_then(|label| self.site.make(label))
            .map(|make| make.vehicle_configs.clone())
            .unwrap_or_default()
    }

    fn input(&self, panel: Panel) -> Node {
        let config = panel.config(&self.panels);
        let placeholder = config.input.clone().unwrap_or_default();
        let selector = config.input_selector().unwrap_or_default();
        Node::new(&format!("input:{}", panel), "input", "", &[selector.as_str(), "input"])
            .attr("placeholder", &placeholder)
            .on_click(Action::OpenPanel(panel))
    }

    fn options(&self, panel: Panel, labels: &[String]) -> Vec<Node> {
        let config = panel.config(&self.panels);
        let scoped = format!("{} li", config.container);
        labels
            .iter()
            .map(|label| {
                Node::new(
                    &format!("option:{}:{}", panel, label),
                    "li",
                    label,
                    &[scoped.as_str(), ".dropbox li", "li"],
                )
                .on_click(Action::Select(panel, label.clone()))
            })
            .collect()
    }

    /// Panel shown once the year step is done (or skipped).
    fn after_token(&self, state: &UiState) -> Panel {
        if !self.vehicle_configs(state).is_empty() && state.vehicle_config.is_none() {
            Panel::VehicleConfig
        } else {
            Panel::System
        }
    }
}

impl Dom for SiteDom {
    fn nodes(&self) -> Vec<Node> {
        let state = self.state.lock().unwrap();
        let mut nodes = vec![self.input(Panel::ProductType)];
        if state.product {
            nodes.push(self.input(Panel::Make));
        }
        let model = self.model(&state);

        let mut next = None;
        if let Some(model) = &model {
            if !model.tokens.is_empty() {
                nodes.push(self.input(Panel::Year));
                if state.token.is_some() {
                    next = Some(self.after_token(&state));
                }
            } else {
                next = Some(self.after_token(&state));
            }
        }
        if next == Some(Panel::System) && !self.vehicle_configs(&state).is_empty() {
            nodes.push(self.input(Panel::VehicleConfig));
        }
        if let Some(panel) = next {
            nodes.push(self.input(panel));
        }

        let labels: Vec<String> = match state.open {
            Some(Panel::ProductType) => vec![self.site.product_type.clone()],
            Some(Panel::Make) => self.site.makes.iter().map(|m| m.label.clone()).collect(),
            Some(Panel::Model) => state
                .make
                .as_deref()
                .and_then(|label| self.site.make(label))
                .map(|make| make.models.iter().map(|m| m.label.clone()).collect())
                .unwrap_or_default(),
            Some(Panel::Year) => model.as_ref().map(|m| m.tokens.clone()).unwrap_or_default(),
            Some(Panel::VehicleConfig) => self.vehicle_configs(&state),
            Some(Panel::System) => model
                .as_ref()
                .map(|m| m.systems.iter().map(|s| s.label.clone()).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        };
        if let Some(panel) = state.open {
            nodes.extend(self.options(panel, &labels));
        }

        if let (Some(model), Some(system), None) = (&model, &state.system, state.open) {
            if let Some(spec) = model.systems.iter().find(|s| &s.label == system) {
                nodes.push(Node::new("result:slide", "div", "", &[".swiper-slide", "div"]));
                for (i, text) in spec.texts.iter().enumerate() {
                    nodes.push(Node::new(
                        &format!("result:text:{}", i),
                        "div",
                        text,
                        &[".calibration-info", "div"],
                    ));
                }
            }
        }
        nodes
    }

    fn activate(&self, node: &Node) {
        let mut state = self.state.lock().unwrap();
        match &node.action {
            Action::None => {}
            Action::OpenPanel(panel) => state.open = Some(*panel),
            Action::Select(panel, label) => {
                self.log.push(format!("{}:{}", panel, label));
                match panel {
                    Panel::ProductType => {
                        state.product = true;
                        state.open = None;
                    }
                    Panel::Make => {
                        state.make = Some(label.clone());
                        state.model = None;
                        state.token = None;
                        state.open = Some(Panel::Model);
                    }
                    Panel::Model => {
                        let broken = state
                            .make
                            .as_deref()
                            .and_then(|m| self.site.make(m))
                            .and_then(|make| make.models.iter().find(|m| &m.label == label))
                            .map(|m| m.broken)
                            .unwrap_or(true);
                        if broken {
                            return;
                        }
                        state.model = Some(label.clone());
                        state.token = None;
                        let has_tokens = self.model(&state).is_some_and(|m| !m.tokens.is_empty());
                        state.open = has_tokens.then_some(Panel::Year);
                    }
                    Panel::Year => {
                        state.token = Some(label.clone());
                        state.open = None;
                    }
                    Panel::VehicleConfig => {
                        state.vehicle_config = Some(label.clone());
                        state.open = None;
                    }
                    Panel::System => {
                        let path = format!(
                            "result:{}/{}/{}/{}",
                            state.make.clone().unwrap_or_default(),
                            state.model.clone().unwrap_or_default(),
                            state.token.clone().unwrap_or_default(),
                            label
                        );
                        self.log.push(path);
                        state.system = Some(label.clone());
                        state.open = None;
                    }
                }
            }
        }
    }

    fn press(&self, key: &str) {
        if key == "Escape" {
            self.state.lock().unwrap().open = None;
        }
    }

    fn reset(&self) {
        *self.state.lock().unwrap() = UiState::default();
    }
}

/// Hands out [`SiteDom`] pages that share one site and one log.
pub struct FixtureBrowser {
    pub site: Arc<SiteSpec>,
    pub log: Arc<SiteLog>,
}

impl FixtureBrowser {
    pub fn new(site: SiteSpec) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(SiteLog::default()),
        }
    }
}

#[async_trait]
impl BrowserProvider for FixtureBrowser {
    async fn open_context(&self, _label: &str) -> Result<Box<dyn BrowserContext>, DriverError> {
        Ok(Box::new(FixtureContext {
            site: self.site.clone(),
            log: self.log.clone(),
        }))
    }
}

pub struct FixtureContext {
    site: Arc<SiteSpec>,
    log: Arc<SiteLog>,
}

#[async_trait]
impl BrowserContext for FixtureContext {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        Ok(Box::new(
            SiteDom::new(self.site.clone(), self.log.clone()).into_page(),
        ))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Default configuration with millisecond budgets.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    let t = &mut config.timeouts;
    t.structural_ms = 30;
    t.exact_ms = 10;
    t.contains_ms = 10;
    t.text_walk_ms = 10;
    t.panel_open_ms = 30;
    t.marker_wait_ms = 40;
    t.poll_interval_ms = 5;
    t.indicator_probe_ms = 5;
    t.detection_attempts = 1;
    t.detection_pause_ms = 5;
    t.settle_ms = 1;
    config.ocr.enabled = false;
    config.run.capture_debug = false;
    config
}

pub fn manufacturer(name: &str, encoding: YearEncoding) -> Manufacturer {
    let mut system_aliases = BTreeMap::new();
    system_aliases.insert(SystemSlot::BlindSpotMonitor, vec!["Blind Spot Monitor".to_string()]);
    system_aliases.insert(
        SystemSlot::WindshieldCamera,
        vec!["Front Camera".to_string(), "Lane Departure Warning".to_string()],
    );
    system_aliases.insert(
        SystemSlot::FrontRadar,
        vec!["Front Radar".to_string(), "Adaptive Cruise Control".to_string()],
    );
    system_aliases.insert(
        SystemSlot::SurroundCamera,
        vec!["360 Camera".to_string(), "Surround View".to_string()],
    );
    Manufacturer {
        name: name.to_string(),
        site_name: name.to_string(),
        site_aliases: Vec::new(),
        year_encoding: encoding,
        model_encodings: BTreeMap::new(),
        region_preference: vec!["CANADA".into(), "USA".into()],
        excluded_regions: vec!["EU".into()],
        required_model_tags: Vec::new(),
        exclude_parenthesized: false,
        banned_keywords: vec!["SUPPORT".into()],
        vehicle_config: None,
        system_aliases,
    }
}

pub fn with_vehicle_config(mut manufacturer: Manufacturer, preferences: &[&str]) -> Manufacturer {
    manufacturer.vehicle_config = Some(VehicleConfigRule {
        preferences: preferences.iter().map(|s| s.to_string()).collect(),
        fallback_first: true,
    });
    manufacturer
}
