use fmaster_config::{load_master_config, StoreBackend};
use std::path::Path;

#[test]
fn load_valid_fixture() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/master.yml");
    let config = load_master_config(&path).expect("should load without error");

    assert_eq!(config.bind_address, "0.0.0.0:8080");
    assert_eq!(config.store_backend, StoreBackend::Memory);
    assert!(config.runtime_recover_enable);
    assert_eq!(config.retry_kill_interval.as_millis(), 15_000);
    assert_eq!(config.kill_timeout.as_secs(), 30);
    assert_eq!(config.sweep_interval.as_secs(), 30);
    assert_eq!(config.auth_token, "test-token");
    assert_eq!(config.nodes, vec![("n1".to_string(), "10.0.0.1:9000".to_string())]);
}

#[test]
fn missing_file_returns_error() {
    let path = Path::new("/nonexistent/path/does/not/exist.yml");
    assert!(load_master_config(path).is_err());
}

#[test]
fn empty_auth_token_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.yml");
    std::fs::write(
        &path,
        "bind_address: \"0.0.0.0:8080\"\nauth_token: \"\"\n",
    )
    .unwrap();
    assert!(load_master_config(&path).is_err());
}

#[test]
fn unknown_store_backend_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.yml");
    std::fs::write(
        &path,
        "bind_address: \"0.0.0.0:8080\"\nstore_backend: redis\nauth_token: \"t\"\n",
    )
    .unwrap();
    assert!(load_master_config(&path).is_err());
}
