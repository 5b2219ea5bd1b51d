use std::time::Duration;

use chroma_booth::config::{ChromaKeyConfig, Configuration, SurfaceConfig};
use chroma_booth::schedule::QualityProfile;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.quality, QualityProfile::Good);
    assert_eq!(cfg.surface, SurfaceConfig { width: 640, height: 480 });
    assert_eq!(cfg.chroma_key, ChromaKeyConfig::default());
    assert_eq!(cfg.chroma_key.key_color, [0, 255, 1]);
    assert!((cfg.chroma_key.threshold - 30.0).abs() < f64::EPSILON);
    assert!((cfg.min_span - 50.0).abs() < f32::EPSILON);
    cfg.validate().unwrap();
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
quality: low
surface:
  width: 1280
  height: 720
chroma-key:
  enabled: false
  key-color: [10, 200, 10]
  threshold: 42.5
driver-interval: 8ms
min-span: 64
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.quality, QualityProfile::Low);
    assert_eq!(cfg.surface.width, 1280);
    assert!(!cfg.chroma_key.enabled);
    assert_eq!(cfg.chroma_key.key_color, [10, 200, 10]);
    assert!((cfg.chroma_key.threshold - 42.5).abs() < f64::EPSILON);
    assert_eq!(cfg.driver_interval, Duration::from_millis(8));
    assert!((cfg.min_span - 64.0).abs() < f32::EPSILON);
}

#[test]
fn unknown_quality_is_rejected() {
    let err = serde_yaml::from_str::<Configuration>("quality: ultra").unwrap_err();
    assert!(err.to_string().contains("ultra"), "{err}");
}

#[test]
fn partial_sections_fill_in_defaults() {
    let yaml = r#"
surface:
  width: 320
chroma-key:
  threshold: 12
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.surface, SurfaceConfig { width: 320, height: 480 });
    assert!(cfg.chroma_key.enabled);
    assert_eq!(cfg.chroma_key.key_color, [0, 255, 1]);
}

#[test]
fn validation_rejects_bad_values() {
    let cases = [
        "surface: { width: 0 }",
        "surface: { height: 9000 }",
        "chroma-key: { threshold: -1 }",
        "driver-interval: 0s",
        "min-span: 0",
    ];
    for yaml in cases {
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validate().is_err(), "expected rejection for {yaml}");
    }
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("booth.yaml");
    std::fs::write(&path, "quality: high\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.quality, QualityProfile::High);

    let missing = dir.path().join("missing.yaml");
    let err = Configuration::from_yaml_file(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("missing.yaml"));
}
