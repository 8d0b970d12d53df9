//! Navigation automaton.
//!
//! Drives the cascading selector UI through
//! `Idle -> ProductTypeSelected -> MakeSelected -> ModelSelected ->
//! YearSelected [-> VehicleConfigSelected] -> SystemSelected`.
//! Every transition opens its panel, resolves the option, clicks it and
//! waits for the next panel's marker. A transition whose marker never shows
//! is retried once with the panel forced open again.

mod navigator;

use std::fmt;

use serde::Serialize;

use crate::resolver::Strategy;

pub use navigator::{choose_vehicle_config, Navigator};

/// Attempts per transition: the first click plus one retry.
pub const TRANSITION_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NavState {
    Idle,
    ProductTypeSelected,
    MakeSelected,
    ModelSelected,
    YearSelected,
    VehicleConfigSelected,
    SystemSelected,
    CalibrationTypeKnown,
    Done,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::ProductTypeSelected => "ProductTypeSelected",
            Self::MakeSelected => "MakeSelected",
            Self::ModelSelected => "ModelSelected",
            Self::YearSelected => "YearSelected",
            Self::VehicleConfigSelected => "VehicleConfigSelected",
            Self::SystemSelected => "SystemSelected",
            Self::CalibrationTypeKnown => "CalibrationTypeKnown",
            Self::Done => "Done",
        };
        f.write_str(name)
    }
}

/// One clicked transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: NavState,
    pub to: NavState,
    /// Label that was clicked.
    pub target: String,
    #[serde(serialize_with = "serialize_strategy")]
    pub strategy: Strategy,
    pub attempts: u32,
}

fn serialize_strategy<S: serde::Serializer>(strategy: &Strategy, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(strategy)
}

/// States visited and the transitions that got there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationTrace {
    pub states: Vec<NavState>,
    pub transitions: Vec<Transition>,
}

impl Default for NavigationTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationTrace {
    pub fn new() -> Self {
        Self {
            states: vec![NavState::Idle],
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> NavState {
        self.states.last().copied().unwrap_or(NavState::Idle)
    }

    /// Enter a state without a click (skipped year step, extraction done).
    pub fn enter(&mut self, state: NavState) {
        self.states.push(state);
    }

    fn record(&mut self, transition: Transition) {
        self.states.push(transition.to);
        self.transitions.push(transition);
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
