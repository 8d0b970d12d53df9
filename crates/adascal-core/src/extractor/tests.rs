use std::sync::atomic::{AtomicUsize, Ordering};

use adascal_config::Config;
use adascal_protocols::Confidence;
use async_trait::async_trait;

use super::*;
use crate::testing::{fast_config, Node, StaticDom};

enum Reply {
    Text(&'static str),
    Unavailable,
}

struct ScriptedRecognizer {
    reply: Reply,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextRecognizer for ScriptedRecognizer {
    async fn recognize(&self, _png: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Unavailable => Err(OcrError::Unavailable("tesseract missing".to_string())),
        }
    }
}

fn extractor_with(config: &Config, recognizer: Option<Arc<dyn TextRecognizer>>) -> CalibrationExtractor {
    let resolver = Arc::new(ElementResolver::from_config(config));
    CalibrationExtractor::new(resolver, config, recognizer).unwrap()
}

fn extractor() -> CalibrationExtractor {
    extractor_with(&fast_config(), None)
}

fn ocr_config() -> Config {
    let mut config = fast_config();
    config.ocr.enabled = true;
    config
}

fn indicator(id: &str, text: &str) -> Node {
    Node::new(id, "div", text, &["div", ".calibration-info"])
}

fn image(id: &str, src: &str, width: f64, height: f64) -> Node {
    Node::new(id, "img", "", &["img"])
        .attr("src", src)
        .sized(width, height)
}

#[tokio::test]
async fn test_static_with_code_in_text() {
    let page = StaticDom::new(vec![
        indicator("label", "Static Calibration"),
        Node::new("code", "span", "Target: AUTEL-CSC0601/01", &["span"]),
    ])
    .into_page();

    let value = extractor().extract(&page, "Blind Spot Monitor").await.unwrap();

    assert_eq!(value, SlotValue::target_code("AUTEL-CSC0601/01"));
}

#[tokio::test]
async fn test_combined_label() {
    let page = StaticDom::new(vec![indicator("label", "Static Calibration+Dynamic Calibration")]).into_page();

    let detection = extractor().detect(&page).await.unwrap();
    assert_eq!(detection, Detection::confirmed(CalibrationType::StaticAndDynamic));

    let value = extractor().extract(&page, "Front Radar").await.unwrap();
    assert_eq!(value.to_string(), "Static Calibration+Dynamic Calibration");
}

#[tokio::test]
async fn test_combined_within_short_indicator() {
    let page = StaticDom::new(vec![indicator(
        "label",
        "Requires Static Calibration and Dynamic Calibration",
    )])
    .into_page();

    let detection = extractor().detect(&page).await.unwrap();
    assert_eq!(detection.calibration, CalibrationType::StaticAndDynamic);
}

#[tokio::test]
async fn test_dynamic_only() {
    let page = StaticDom::new(vec![indicator("label", "Dynamic Calibration")]).into_page();

    let value = extractor().extract(&page, "Front Camera").await.unwrap();

    assert_eq!(
        value,
        SlotValue::Calibration(Detection::confirmed(CalibrationType::Dynamic))
    );
}

#[tokio::test]
async fn test_body_text_fallback() {
    let page = StaticDom::new(vec![Node::new(
        "note",
        "em",
        "perform STATIC CALIBRATION after replacement",
        &["em"],
    )])
    .into_page();

    let detection = extractor().detect(&page).await.unwrap();
    assert_eq!(detection, Detection::confirmed(CalibrationType::Static));
}

#[tokio::test]
async fn test_diagram_only_is_assumed_static() {
    let page = StaticDom::new(vec![Node::new("slide", "div", "", &[".swiper-slide", "div"])]).into_page();

    let value = extractor().extract(&page, "360 Camera").await.unwrap();

    assert_eq!(value, SlotValue::Calibration(Detection::assumed_static()));
    assert_eq!(value.to_string(), "Static Calibration (Assumed)");
}

#[tokio::test]
async fn test_diagram_only_code_stays_assumed() {
    let config = ocr_config();
    let recognizer = ScriptedRecognizer::new(Reply::Text("CSC0601/01"));
    let extractor = extractor_with(&config, Some(recognizer.clone() as Arc<dyn TextRecognizer>));
    let page = StaticDom::new(vec![
        Node::new("slide", "div", "", &[".swiper-slide", "div"]),
        image("board", "https://download1.auteltech.net/calibration/board.png", 400.0, 300.0),
    ])
    .into_page();

    let value = extractor.extract(&page, "360 Camera").await.unwrap();

    assert_eq!(
        value,
        SlotValue::TargetCode {
            code: "CSC0601/01".to_string(),
            confidence: Confidence::Assumed,
        }
    );
    assert_eq!(value.to_string(), "CSC0601/01 (Assumed)");
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_no_indicator_is_extraction_failure() {
    let page = StaticDom::new(vec![Node::new("x", "div", "Coverage", &["div"])]).into_page();

    let err = extractor().extract(&page, "Front Radar").await.unwrap_err();

    assert_eq!(err.kind(), "extraction_failure");
}

#[tokio::test]
async fn test_code_read_from_calibration_image() {
    let config = ocr_config();
    let recognizer = ScriptedRecognizer::new(Reply::Text("board CSC1004/02 left"));
    let extractor = extractor_with(&config, Some(recognizer.clone() as Arc<dyn TextRecognizer>));
    let page = StaticDom::new(vec![
        indicator("label", "Static Calibration"),
        image("icon", "https://download1.auteltech.net/calibration/icon.png", 20.0, 20.0),
        image("logo", "https://cdn.example.com/logo.png", 400.0, 300.0),
        image("board", "https://download1.auteltech.net/calibration/board.png", 400.0, 300.0),
    ])
    .into_page();

    let code = extractor.extract_target_code(&page).await.unwrap();

    assert_eq!(code.as_deref(), Some("CSC1004/02"));
    assert_eq!(page.screenshots(), vec![Some("board".to_string())]);
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unavailable_ocr_falls_back_to_containers() {
    let config = ocr_config();
    let recognizer = ScriptedRecognizer::new(Reply::Unavailable);
    let extractor = extractor_with(&config, Some(recognizer.clone() as Arc<dyn TextRecognizer>));
    let page = StaticDom::new(vec![
        image("a", "https://download1.auteltech.net/adas/a.png", 400.0, 300.0),
        image("b", "https://download1.auteltech.net/adas/b.png", 400.0, 300.0),
        Node::new("slide", "div", "Board CSC0802/01", &[".swiper-slide"]).hidden(),
    ])
    .into_page();

    let code = extractor.extract_target_code(&page).await.unwrap();

    assert_eq!(code.as_deref(), Some("CSC0802/01"));
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_ocr_never_screenshots() {
    let recognizer = ScriptedRecognizer::new(Reply::Text("CSC1004"));
    let extractor = extractor_with(&fast_config(), Some(recognizer.clone() as Arc<dyn TextRecognizer>));
    let page = StaticDom::new(vec![image(
        "board",
        "https://download1.auteltech.net/calibration/board.png",
        400.0,
        300.0,
    )])
    .into_page();

    assert_eq!(extractor.extract_target_code(&page).await.unwrap(), None);
    assert!(page.screenshots().is_empty());
}

#[test]
fn test_find_target_code_returns_match_unchanged() {
    let re = Regex::new(&Config::default().extractor.code_pattern).unwrap();
    assert_eq!(
        find_target_code(&re, "See AUTEL-CSC0601/01/02 board").as_deref(),
        Some("AUTEL-CSC0601/01/02")
    );
    assert_eq!(find_target_code(&re, "CSC1201").as_deref(), Some("CSC1201"));
    assert_eq!(find_target_code(&re, "CSC12"), None);
}

#[test]
fn test_invalid_code_pattern_is_configuration_error() {
    let mut config = fast_config();
    config.extractor.code_pattern = "(".to_string();
    let resolver = Arc::new(ElementResolver::from_config(&config));

    let err = CalibrationExtractor::new(resolver, &config, None).err().unwrap();

    assert_eq!(err.kind(), "configuration_error");
}
