//! Config file tests

use autocast::config::Config;
use autocast::models::Device;
use tempfile::TempDir;

#[test]
fn test_missing_file_writes_starter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("autocast").join("config.toml");

    let config = Config::load_from(&path).unwrap();

    assert_eq!(config, Config::starter());
    assert_eq!(config.devices.len(), 2);
    assert!(path.exists());

    // Second load reads what was written
    assert_eq!(Config::load_from(&path).unwrap(), config);
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::starter();
    config.tmdb_api_key = Some("abc123".to_string());
    config.devices.push(Device {
        name: "Den".to_string(),
        address: "10.0.0.9".to_string(),
        port: 9000,
    });
    config.providers.demo = true;
    config.search.concurrency = 4;
    config.cast.wake_when_unresponsive = false;

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(loaded.find_device("den").map(|d| d.port), Some(9000));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[cast\nmax_boot_polls = ").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid config file"));
}

#[test]
fn test_empty_file_is_all_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}
