//! Configuration file discovery, loading and initialization.

use std::fs;

use sql_diff_cli::config::{Config, ConfigError, CONFIG_FILE_NAME};

#[test]
fn test_locate_prefers_explicit_then_cwd_then_home() {
    let cwd = tempfile::tempdir().unwrap();
    let home = tempfile::tempdir().unwrap();
    let explicit = cwd.path().join("custom.yaml");

    assert_eq!(Config::locate(None, cwd.path(), Some(home.path())).unwrap(), None);

    fs::write(home.path().join(CONFIG_FILE_NAME), "").unwrap();
    assert_eq!(
        Config::locate(None, cwd.path(), Some(home.path())).unwrap(),
        Some(home.path().join(CONFIG_FILE_NAME))
    );

    fs::write(cwd.path().join(CONFIG_FILE_NAME), "").unwrap();
    assert_eq!(
        Config::locate(None, cwd.path(), Some(home.path())).unwrap(),
        Some(cwd.path().join(CONFIG_FILE_NAME))
    );

    fs::write(&explicit, "").unwrap();
    assert_eq!(
        Config::locate(Some(&explicit), cwd.path(), Some(home.path())).unwrap(),
        Some(explicit)
    );
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = Config::locate(Some(&missing), dir.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(path) if path == missing));
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(
        &path,
        "ai:\n  provider: openai\n  api_endpoint: https://api.openai.com/v1\n  model: gpt-4o-mini\n\
         diff:\n  rename_threshold: 0.9\n  rename_hints:\n    - table: users\n      from: name\n      to: full_name\n\
         dialect: postgres\n",
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.ai.provider, "openai");
    assert_eq!(config.ai.model, "gpt-4o-mini");
    assert_eq!(config.ai.timeout, 30);
    assert!((config.diff.rename_threshold - 0.9).abs() < f64::EPSILON);
    assert_eq!(config.diff.rename_hints.len(), 1);
    assert_eq!(config.diff.rename_hints[0].to_string(), "users.name=full_name");
    assert_eq!(config.dialect.as_deref(), Some("postgres"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "\n").unwrap();
    assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

#[test]
fn test_invalid_yaml_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "ai: [unclosed\n").unwrap();
    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }));
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

#[test]
fn test_write_default_respects_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    Config::write_default(&path, false).unwrap();
    assert_eq!(Config::from_file(&path).unwrap(), Config::default());

    fs::write(&path, "ai:\n  enabled: true\n").unwrap();
    let err = Config::write_default(&path, false).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists(_)));

    Config::write_default(&path, true).unwrap();
    assert!(!Config::from_file(&path).unwrap().ai.enabled);
}

#[test]
fn test_masked_yaml_hides_key() {
    let mut config = Config::default();
    config.ai.api_key = "sk-abcdefghijklmnop".to_string();
    let yaml = config.masked().to_yaml().unwrap();
    assert!(yaml.contains("sk-a****mnop"));
    assert!(!yaml.contains("sk-abcdefghijklmnop"));
}

#[test]
fn test_dialect_flag_overrides_file_dialect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "dialect: oracle\n").unwrap();

    let mut config = Config::from_file(&path).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    config.apply_dialect_flags(Some("postgres"), false);
    assert!(config.validate().is_ok());
    assert_eq!(config.dialect.as_deref(), Some("postgres"));
}
