//! # Configuration Tests

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use simharness::Config;
use simharness::common::ConfigError;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.mcu, None);
    assert_eq!(config.frequency, None);
    assert_eq!(config.firmware, None);
    assert!(!config.general.quiet);
    assert!(!config.general.trace_irqs);
    assert_eq!(config.trace.path, None);
    assert_eq!(config.trace.flush_period, 100_000);
}

#[test]
fn test_minimal_json() {
    let config = Config::from_json(r#"{ "mcu": "atmega48" }"#).unwrap();
    assert_eq!(config.mcu.as_deref(), Some("atmega48"));
    assert_eq!(config.trace.flush_period, 100_000);
}

#[test]
fn test_full_json() {
    let json = r#"{
        "mcu": "attiny85",
        "frequency": 8000000,
        "firmware": "build/attiny85_pin.hex",
        "general": { "quiet": true, "trace_irqs": true },
        "trace": { "path": "pin.vcd", "flush_period": 500 }
    }"#;

    let config = Config::from_json(json).unwrap();

    assert_eq!(config.frequency, Some(8_000_000));
    assert_eq!(config.firmware, Some(PathBuf::from("build/attiny85_pin.hex")));
    assert!(config.general.quiet);
    assert!(config.general.trace_irqs);
    assert_eq!(config.trace.path, Some(PathBuf::from("pin.vcd")));
    assert_eq!(config.trace.flush_period, 500);
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    let err = Config::from_json(r#"{ "frequency": "fast" }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().starts_with("invalid config:"));
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("harness.json");
    fs::write(&path, r#"{ "mcu": "attiny85", "frequency": 1000000 }"#).unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.mcu.as_deref(), Some("attiny85"));
    assert_eq!(config.frequency, Some(1_000_000));
}

#[test]
fn test_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_builders() {
    let config = Config::default()
        .with_mcu("atmega48")
        .with_frequency(20_000_000)
        .with_firmware("fw.elf");
    assert_eq!(config.mcu.as_deref(), Some("atmega48"));
    assert_eq!(config.frequency, Some(20_000_000));
    assert_eq!(config.firmware, Some(PathBuf::from("fw.elf")));
}
