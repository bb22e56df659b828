use indy_config::{discover_config_path, load_for_root, ConfigError, IndyConfig};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn indy_toml_wins_over_the_hidden_variant() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(".indy.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();
    assert_eq!(
        discover_config_path(dir.path()),
        Some(dir.path().join(".indy.toml"))
    );

    std::fs::write(dir.path().join("indy.toml"), "[logging]\nlevel = \"debug\"\n").unwrap();
    assert_eq!(
        discover_config_path(dir.path()),
        Some(dir.path().join("indy.toml"))
    );
    let (config, path) = load_for_root(dir.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(path, Some(dir.path().join("indy.toml")));
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let (config, path) = load_for_root(dir.path()).unwrap();
    assert_eq!(config, IndyConfig::default());
    assert_eq!(path, None);
}

#[test]
fn unreadable_config_names_the_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = IndyConfig::load_from_path(&missing).unwrap_err();
    let ConfigError::Io { path, .. } = &err else {
        panic!("expected an io error, got {err:?}");
    };
    assert_eq!(path, &missing.display().to_string());
    assert!(err.to_string().contains("nope.toml"));
}
