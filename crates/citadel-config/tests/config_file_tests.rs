//! File and process-environment loading for `LoaderConfig`.

use citadel_config::{ConfigError, LoaderConfig, RunMode, StorageMode, ENV_DB_HOST, ENV_DB_PORT};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    std::env::remove_var(ENV_DB_HOST);
    std::env::remove_var(ENV_DB_PORT);

    let file = write_config(
        r#"
[database]
name = "Multiverse"
storage = "memory"

[run]
mode = "upsert"
"#,
    );

    let config = LoaderConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.database.name, "Multiverse");
    assert_eq!(config.database.storage, StorageMode::Memory);
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.run.mode, RunMode::Upsert);
    assert_eq!(config.run.write_concurrency, 16);
    assert_eq!(config.api.page_concurrency, 4);
}

#[test]
#[serial]
fn test_environment_wins_over_file() {
    let file = write_config(
        r#"
[database]
host = "from-file"
port = 1111
"#,
    );

    std::env::set_var(ENV_DB_HOST, "from-env");
    std::env::remove_var(ENV_DB_PORT);
    let config = LoaderConfig::load(Some(file.path()));
    std::env::remove_var(ENV_DB_HOST);

    let config = config.unwrap();
    assert_eq!(config.database.host, "from-env");
    assert_eq!(config.database.port, 1111);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    let err = LoaderConfig::load(Some(std::path::Path::new("/nonexistent/citadel.toml")))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
#[serial]
fn test_malformed_file_is_a_parse_error() {
    let file = write_config("[database\nhost = ");
    let err = LoaderConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
