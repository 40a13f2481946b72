//! 配置系统单元测试

use crate::util::config::{load_config, ConfigError, EngineConfig, CONFIG_FILE_NAME};
use std::fs;

#[test]
fn test_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.interpreter.pacing_cap_ms, 500);
    assert_eq!(config.interpreter.max_loop_iterations, 10_000);
    assert_eq!(config.interpreter.max_call_depth, 64);
    assert_eq!(config.movement.step_ms, 300);
    assert_eq!(config.log.level, "info");
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = EngineConfig::from_toml(
        r#"
        [interpreter]
        pacing_cap_ms = 50
        "#,
    )
    .unwrap();
    assert_eq!(config.interpreter.pacing_cap_ms, 50);
    assert_eq!(config.interpreter.max_call_depth, 64);
    assert_eq!(config.movement.step_ms, 300);
}

#[test]
fn test_toml_round_trip() {
    let mut config = EngineConfig::default();
    config.movement.step_ms = 120;
    let text = config.to_toml().unwrap();
    assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
}

#[test]
fn test_load_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(load_config(None, dir.path()).unwrap(), EngineConfig::default());

    fs::write(dir.path().join(CONFIG_FILE_NAME), "[log]\nlevel = \"debug\"\n").unwrap();
    let config = load_config(None, dir.path()).unwrap();
    assert_eq!(config.log.level, "debug");
}

#[test]
fn test_explicit_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_config(Some(&missing), dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_invalid_toml() {
    let err = EngineConfig::from_toml("[interpreter\npacing").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
