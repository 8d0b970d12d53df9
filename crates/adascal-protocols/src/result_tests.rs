use super::*;

fn code(s: &str) -> SlotValue {
    SlotValue::target_code(s)
}

#[test]
fn test_slot_value_labels() {
    assert_eq!(SlotValue::NotAvailable.to_string(), "N/A");
    assert_eq!(
        SlotValue::Calibration(Detection::confirmed(CalibrationType::Dynamic)).to_string(),
        "Dynamic Calibration"
    );
    assert_eq!(
        SlotValue::Calibration(Detection::confirmed(CalibrationType::StaticAndDynamic))
            .to_string(),
        "Static Calibration+Dynamic Calibration"
    );
    assert_eq!(
        SlotValue::Calibration(Detection::assumed_static()).to_string(),
        "Static Calibration (Assumed)"
    );
}

#[test]
fn test_slot_value_from_string() {
    assert_eq!(SlotValue::from("N/A".to_string()), SlotValue::NotAvailable);
    assert_eq!(
        SlotValue::from("Static Calibration (Assumed)".to_string()),
        SlotValue::Calibration(Detection::assumed_static())
    );
    assert_eq!(
        SlotValue::from("AUTEL-CSC0601/01".to_string()),
        code("AUTEL-CSC0601/01")
    );
}

#[test]
fn test_from_detection_prefers_code_for_static() {
    let value = SlotValue::from_detection(
        Detection::confirmed(CalibrationType::Static),
        Some("CSC0802".to_string()),
    );
    assert_eq!(value, code("CSC0802"));
}

#[test]
fn test_assumed_static_code_keeps_marker() {
    let value = SlotValue::from_detection(Detection::assumed_static(), Some("CSC0601/01".to_string()));
    assert_eq!(
        value,
        SlotValue::TargetCode {
            code: "CSC0601/01".to_string(),
            confidence: Confidence::Assumed,
        }
    );
    assert_eq!(value.to_string(), "CSC0601/01 (Assumed)");
    assert_ne!(value, code("CSC0601/01"));

    let json = serde_json::to_value(&value).unwrap();
    assert_eq!(json, "CSC0601/01 (Assumed)");
    let back: SlotValue = serde_json::from_value(json).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_from_detection_dynamic_ignores_code() {
    let value = SlotValue::from_detection(
        Detection::confirmed(CalibrationType::Dynamic),
        Some("CSC0802".to_string()),
    );
    assert_eq!(
        value,
        SlotValue::Calibration(Detection::confirmed(CalibrationType::Dynamic))
    );
}

#[test]
fn test_from_detection_unknown_is_not_available() {
    let value = SlotValue::from_detection(Detection::unknown(), Some("CSC0802".to_string()));
    assert_eq!(value, SlotValue::NotAvailable);
}

#[test]
fn test_result_serializes_as_flat_map() {
    let mut result = AdasResult::all_not_available();
    result.set(SystemSlot::FrontRadar, code("AUTEL-CSC0601/01"));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["adas_front_radar"], "AUTEL-CSC0601/01");
    assert_eq!(json["adas_360_camera"], "N/A");

    let back: AdasResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn test_set_never_reverts_populated() {
    let mut result = AdasResult::new();
    assert!(result.set(SystemSlot::FrontRadar, code("CSC0601")));
    assert!(!result.set(SystemSlot::FrontRadar, SlotValue::NotAvailable));
    assert!(!result.set(SystemSlot::FrontRadar, code("CSC9999")));
    assert_eq!(result.get(SystemSlot::FrontRadar), Some(&code("CSC0601")));
}

#[test]
fn test_set_upgrades_not_available() {
    let mut result = AdasResult::all_not_available();
    assert!(result.set(SystemSlot::WindshieldCamera, code("CSC0500")));
    assert!(!result.set(SystemSlot::WindshieldCamera, SlotValue::NotAvailable));
}

#[test]
fn test_completeness() {
    let mut result = AdasResult::new();
    result.set(SystemSlot::FrontRadar, code("CSC0601"));
    assert!(!result.is_complete());
    result.merge_from(&AdasResult::all_not_available());
    assert!(result.is_complete());
    assert_eq!(result.populated_count(), 1);
}

#[test]
fn test_manufacturer_results_record_and_counts() {
    let mut results = ManufacturerResults::default();
    let mut partial = AdasResult::new();
    partial.set(SystemSlot::BlindSpotMonitor, code("CSC0700"));

    assert!(results.record("X5", "G05", &partial));
    assert!(!results.is_complete("X5", "G05"));
    assert!(results.record("X5", "G05", &AdasResult::all_not_available()));
    assert!(results.is_complete("X5", "G05"));
    assert_eq!(
        results.get("X5", "G05").unwrap().get(SystemSlot::BlindSpotMonitor),
        Some(&code("CSC0700"))
    );

    results.record("X3", "G01", &partial);
    assert_eq!(results.counts(), (2, 1));
}

#[test]
fn test_manufacturer_results_merge_is_idempotent() {
    let mut a = ManufacturerResults::default();
    a.record("A4", "2017-2023", &AdasResult::all_not_available());
    let snapshot = a.clone();

    assert!(!a.merge_from(&snapshot));
    assert_eq!(a, snapshot);
}

#[test]
fn test_manufacturer_results_json_shape() {
    let mut results = ManufacturerResults::default();
    results.record("Camry", "2022", &AdasResult::all_not_available());
    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json["models"]["Camry"]["2022"]["adas_front_radar"], "N/A");
}
