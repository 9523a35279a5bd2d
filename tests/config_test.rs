// Configuration file tests

use nest_timelapse::config::{AppConfig, ConfigError};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.sdm.enterprise_id = Some("project-1".to_string());
    config.paths.output_dir = PathBuf::from("/srv/nest");
    config.capture.record_secs = 3;
    config.timelapse.speedup = "1d/30s".to_string();

    config.save_to_file(&path).unwrap();
    let loaded = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.timelapse.speedup_ratio().unwrap().value(), 2880.0);
}

#[test]
fn test_load_explicit_path_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[capture]\nrecord_secs = 0\n\n[timelapse]\nmax_output_rate = 0.0\n").unwrap();

    match AppConfig::load(Some(&path)) {
        Err(ConfigError::Invalid(errors)) => {
            assert_eq!(errors.len(), 2);
            assert!(errors[0].contains("record_secs"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_load_missing_explicit_file() {
    let dir = TempDir::new().unwrap();
    let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_settings_convert_to_runtime_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[capture]\nrecord_secs = 7\nice_servers = [\"stun:stun.example.org:3478\"]\n\n[timelapse]\nfile_prefix = \"porch_\"\nfile_extension = \"png\"\n",
    )
    .unwrap();

    let config = AppConfig::load(Some(&path)).unwrap();
    let capture = config.capture.to_capture_config();
    assert_eq!(capture.record_duration, Duration::from_secs(7));
    assert_eq!(capture.close_timeout, Duration::from_secs(30));
    assert_eq!(
        config.capture.to_peer_config().ice_servers,
        vec!["stun:stun.example.org:3478".to_string()]
    );

    let naming = config.timelapse.artifact_name();
    assert_eq!(naming.prefix(), "porch_");
    assert_eq!(naming.extension(), "png");
}
