//! # adascal core
//!
//! Navigation, classification and extraction engine.
//!
//! ## Components
//!
//! - [`ElementResolver`] - Ordered selector strategies with per-strategy budgets
//! - [`Navigator`] - The selector cascade as an explicit state machine
//! - [`rules`] - Model filtering and year / chassis token classification
//! - [`CalibrationExtractor`] - Calibration type and target code extraction
//! - [`Orchestrator`] - Resumable run over manufacturers, models and tokens

pub mod automaton;
pub mod diagnostics;
pub mod discovery;
pub mod extractor;
pub mod orchestrator;
pub mod resolver;
pub mod rules;

#[cfg(test)]
mod testing;

pub use automaton::{choose_vehicle_config, NavState, NavigationTrace, Navigator, Transition};
pub use diagnostics::DebugCapture;
pub use extractor::{find_target_code, CalibrationExtractor};
pub use orchestrator::Orchestrator;
pub use resolver::{ElementResolver, Panel, Resolved, ResolverSettings, Strategy, Target};
pub use rules::{classify_tokens, filter_models, is_model_included, token_from_model_label};
