//! Interrupted-run and resume scenarios against the file store.

use adascal_checkpoint::{CheckpointStore, FileCheckpointStore, ReportKind, RunReport};
use adascal_protocols::{AdasResult, ManufacturerResults, SlotValue, SystemSlot};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn result(values: &[(SystemSlot, &str)]) -> AdasResult {
    let mut result = AdasResult::new();
    for (slot, value) in values {
        result.set(*slot, SlotValue::from(value.to_string()));
    }
    result
}

fn complete() -> AdasResult {
    result(&[
        (SystemSlot::BlindSpotMonitor, "AUTEL-CSC0601/01"),
        (SystemSlot::WindshieldCamera, "Dynamic Calibration"),
        (SystemSlot::FrontRadar, "CSC0802/01 (Assumed)"),
        (SystemSlot::SurroundCamera, "N/A"),
    ])
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_interrupted_run_resumes_where_it_stopped() {
    let temp_dir = TempDir::new().unwrap();

    // First run: one token complete, one interrupted after a single slot.
    {
        let store = FileCheckpointStore::new(temp_dir.path()).await.unwrap();
        store
            .save_tokens("BMW", "3 Series", &["G20".to_string(), "F30".to_string()])
            .await
            .unwrap();

        let mut results = ManufacturerResults::default();
        results.record("3 Series", "G20", &complete());
        store.save("BMW", &results).await.unwrap();
        results.record(
            "3 Series",
            "F30",
            &result(&[(SystemSlot::FrontRadar, "Static Calibration")]),
        );
        store.save("BMW", &results).await.unwrap();
    }

    // Second run sees what is left to do.
    let store = FileCheckpointStore::new(temp_dir.path()).await.unwrap();
    let tokens = store.load_tokens("BMW").await.unwrap();
    let mut pending = Vec::new();
    for token in &tokens["3 Series"] {
        if !store.has("BMW", "3 Series", token).await.unwrap() {
            pending.push(token.clone());
        }
    }
    assert_eq!(pending, vec!["F30"]);

    let mut results = ManufacturerResults::default();
    results.record("3 Series", "F30", &AdasResult::all_not_available());
    store.save("BMW", &results).await.unwrap();

    let loaded = store.load("BMW").await.unwrap();
    let f30 = loaded.get("3 Series", "F30").unwrap();
    assert!(f30.is_complete());
    assert_eq!(
        f30.get(SystemSlot::FrontRadar).unwrap().to_string(),
        "Static Calibration"
    );
    assert_eq!(loaded.counts(), (2, 2));
}

#[tokio::test]
async fn test_combined_export_and_report_share_results_dir() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::new(temp_dir.path()).await.unwrap();

    let mut bmw = ManufacturerResults::default();
    bmw.record("X3", "G01", &complete());
    store.save("BMW", &bmw).await.unwrap();
    let mut ram = ManufacturerResults::default();
    ram.record("1500", "2022", &AdasResult::all_not_available());
    store.save("RAM", &ram).await.unwrap();

    let mut report = RunReport::new();
    report.completed("BMW", "X3", "G01");
    report.completed("RAM", "1500", "2022");
    report.finish(false);
    report.write(store.results_dir()).await.unwrap();
    store.export_combined().await.unwrap();

    let combined: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.combined_path()).unwrap()).unwrap();
    assert_eq!(
        combined["BMW"]["models"]["X3"]["G01"]["adas_front_radar"],
        "CSC0802/01 (Assumed)"
    );
    assert_eq!(
        combined["RAM"]["models"]["1500"]["2022"]["adas_360_camera"],
        "N/A"
    );

    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp_dir.path().join("run_report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(written["entries"].as_array().unwrap().len(), 2);
    assert_eq!(report.count(ReportKind::Completed), 2);
    assert_eq!(store.manufacturers().await.unwrap(), vec!["BMW", "RAM"]);
}
