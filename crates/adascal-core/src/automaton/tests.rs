use std::sync::Arc;

use adascal_protocols::{ScrapeError, VehicleConfigRule, YearEncoding, YearOrChassisToken};

use super::*;
use crate::resolver::{ElementResolver, Panel, Strategy};
use crate::rules::classify;
use crate::testing::{
    fast_config, manufacturer, with_vehicle_config, MakeSpec, ModelSpec, SiteDom, SiteLog,
    SiteSpec,
};

fn navigator() -> Navigator {
    let config = fast_config();
    Navigator::new(Arc::new(ElementResolver::from_config(&config)), &config)
}

fn bmw_site() -> SiteSpec {
    SiteSpec::new(vec![MakeSpec::new(
        "BMW",
        vec![
            ModelSpec::new("3 Series", &["G20", "F30"]),
            ModelSpec::new("X9", &["G99"]).broken(),
        ],
    )])
}

fn page_for(site: SiteSpec) -> (crate::testing::FixturePage<SiteDom>, Arc<SiteLog>) {
    let log = Arc::new(SiteLog::default());
    (SiteDom::new(Arc::new(site), log.clone()).into_page(), log)
}

#[tokio::test]
async fn test_navigate_to_token_walks_every_state() {
    let (page, log) = page_for(bmw_site());
    let bmw = manufacturer("BMW", YearEncoding::ChassisCode);
    let token = classify(&bmw, "3 Series", "F30").unwrap();

    let trace = navigator()
        .navigate_to_token(&page, &bmw, "3 Series", &token)
        .await
        .unwrap();

    assert_eq!(
        trace.states,
        vec![
            NavState::Idle,
            NavState::ProductTypeSelected,
            NavState::MakeSelected,
            NavState::ModelSelected,
            NavState::YearSelected,
        ]
    );
    assert!(trace
        .transitions
        .iter()
        .all(|t| t.strategy == Strategy::StructuralExact && t.attempts == 1));
    assert_eq!(trace.transitions[3].target, "F30");
    assert!(log.contains("year:F30"));
}

#[tokio::test]
async fn test_unresponsive_model_is_retried_once_then_fails() {
    let (page, log) = page_for(bmw_site());
    let bmw = manufacturer("BMW", YearEncoding::ChassisCode);

    let err = navigator()
        .navigate_to_model(&page, &bmw, "X9")
        .await
        .unwrap_err();

    match err {
        ScrapeError::TransitionFailure { state, target, .. } => {
            assert_eq!(state, "MakeSelected");
            assert_eq!(target, "X9");
        }
        other => panic!("unexpected error: {}", other),
    }
    let clicks = log.events().iter().filter(|e| *e == "model:X9").count();
    assert_eq!(clicks, TRANSITION_ATTEMPTS as usize);
}

#[tokio::test]
async fn test_make_alias_is_tried_after_site_name() {
    let site = SiteSpec::new(vec![MakeSpec::new(
        "Mercedes-Benz",
        vec![ModelSpec::new("C-Class", &[])],
    )]);
    let (page, _log) = page_for(site);
    let mut mercedes = manufacturer("MERCEDES-BENZ", YearEncoding::NoYear);
    mercedes.site_name = "MB".to_string();
    mercedes.site_aliases = vec!["Mercedes-Benz".to_string()];

    let trace = navigator()
        .navigate_to_token(&page, &mercedes, "C-Class", &YearOrChassisToken::whole_model())
        .await
        .unwrap();

    assert_eq!(trace.transitions[1].target, "Mercedes-Benz");
    // Whole-model tokens skip the year click.
    assert_eq!(trace.current(), NavState::YearSelected);
    assert_eq!(trace.transitions.len(), 3);
}

#[tokio::test]
async fn test_vehicle_config_step_follows_preferences() {
    let mut make = MakeSpec::new("AUDI", vec![ModelSpec::new("A4", &["2019>"])]);
    make.vehicle_configs = vec!["2.0L Diesel".to_string(), "3.0L Petrol".to_string()];
    let (page, log) = page_for(SiteSpec::new(vec![make]));
    let audi = with_vehicle_config(
        manufacturer("AUDI", YearEncoding::ModelDesignation),
        &["petrol"],
    );
    let token = classify(&audi, "A4", "2019>").unwrap();

    let trace = navigator()
        .navigate_to_token(&page, &audi, "A4", &token)
        .await
        .unwrap();

    assert_eq!(trace.current(), NavState::VehicleConfigSelected);
    assert!(log.contains("vehicle_config:3.0L Petrol"));
}

#[tokio::test]
async fn test_list_and_dismiss_system_options() {
    let (page, _log) = page_for(bmw_site());
    let bmw = manufacturer("BMW", YearEncoding::ChassisCode);
    let token = classify(&bmw, "3 Series", "G20").unwrap();
    let navigator = navigator();
    navigator
        .navigate_to_token(&page, &bmw, "3 Series", &token)
        .await
        .unwrap();

    let systems = navigator.list_options(&page, Panel::System).await.unwrap();
    assert_eq!(systems, vec!["Blind Spot Monitor", "Front Camera", "Front Radar"]);

    navigator.dismiss(&page).await.unwrap();
    let open = adascal_protocols::PageDriver::query_all(&page, ".dropbox li")
        .await
        .unwrap();
    assert!(open.is_empty());
}

#[test]
fn test_choose_vehicle_config() {
    let options = vec!["Sedan".to_string(), "Wagon".to_string()];
    let rule = VehicleConfigRule {
        preferences: vec!["coupe".to_string(), "WAGON".to_string()],
        fallback_first: false,
    };
    assert_eq!(choose_vehicle_config(&rule, &options).as_deref(), Some("Wagon"));

    let rule = VehicleConfigRule {
        preferences: vec!["coupe".to_string(), "(".to_string()],
        fallback_first: false,
    };
    assert_eq!(choose_vehicle_config(&rule, &options), None);

    let rule = VehicleConfigRule {
        preferences: Vec::new(),
        fallback_first: true,
    };
    assert_eq!(choose_vehicle_config(&rule, &options).as_deref(), Some("Sedan"));
}

#[test]
fn test_trace_starts_idle() {
    let mut trace = NavigationTrace::new();
    assert_eq!(trace.current(), NavState::Idle);
    trace.enter(NavState::Done);
    assert_eq!(trace.current(), NavState::Done);
    assert_eq!(NavState::CalibrationTypeKnown.to_string(), "CalibrationTypeKnown");
}
