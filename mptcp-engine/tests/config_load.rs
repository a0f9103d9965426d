use std::fs;
use std::io::Write;

use mptcp_engine::config::load_from_path;
use mptcp_engine::EngineError;

#[test]
fn loads_minimal_config() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "seed = 42")?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.seed, 42);
    assert_eq!(cfg.version, 0);
    assert!(!cfg.dss_checksum);
    Ok(())
}

#[test]
fn loads_full_config() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        r#"
seed = 7
version = 0
dss_checksum = true
"#,
    )?;

    let cfg = load_from_path(&path)?;
    assert_eq!(cfg.seed, 7);
    assert!(cfg.dss_checksum);
    Ok(())
}

#[test]
fn rejects_unsupported_version() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "seed = 1")?;
    writeln!(file, "version = 1")?;

    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() {
    let err = load_from_path("/nonexistent/engine.toml").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn malformed_toml_is_a_config_error() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "seed = ")?;

    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    Ok(())
}
