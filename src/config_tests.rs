use super::*;
use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn file_with_base(base_url: &str) -> ConfigFile {
    ConfigFile {
        schema_version: CONFIG_SCHEMA_VERSION,
        base_url: Some(base_url.to_string()),
        ..ConfigFile::default()
    }
}

#[test]
fn defaults_apply_when_only_base_url_is_known() {
    let config = resolve_config(
        &ConfigOverrides::default(),
        None,
        env_from(&[(ENV_BASE_URL, "http://localhost:8080/")]),
    )
    .expect("resolve");
    assert_eq!(config.base_url, "http://localhost:8080");
    assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(config.actor, DEFAULT_ACTOR);
    assert_eq!(config.region, DEFAULT_REGION);
    assert_eq!(config.environment, DEFAULT_ENVIRONMENT);
    assert!(config.api_key.is_none());
}

#[test]
fn flags_beat_file_and_file_beats_env() {
    let mut file = file_with_base("http://from-file");
    file.timeout_ms = Some(5_000);
    file.api_key = Some("file-key".to_string());
    let overrides = ConfigOverrides {
        base_url: Some("http://from-flag".to_string()),
        ..ConfigOverrides::default()
    };
    let env = env_from(&[
        (ENV_BASE_URL, "http://from-env"),
        (ENV_TIMEOUT_MS, "9000"),
        (ENV_API_KEY, "env-key"),
    ]);

    let config = resolve_config(&overrides, Some(&file), env).expect("resolve");
    assert_eq!(config.base_url, "http://from-flag");
    assert_eq!(config.timeout_ms, 5_000);
    assert_eq!(config.api_key.as_deref(), Some("file-key"));
}

#[test]
fn env_fills_gaps_left_by_file() {
    let file = file_with_base("http://from-file");
    let env = env_from(&[
        (ENV_POLL_INTERVAL_MS, "100"),
        (ENV_ACTOR, "ops-bot"),
        (ENV_AUTHORIZATION, "Bearer abc"),
    ]);
    let config = resolve_config(&ConfigOverrides::default(), Some(&file), env).expect("resolve");
    assert_eq!(config.poll_interval_ms, 100);
    assert_eq!(config.actor, "ops-bot");
    assert_eq!(config.authorization.as_deref(), Some("Bearer abc"));
    assert_eq!(config.poll_interval(), Duration::from_millis(100));
}

#[test]
fn missing_base_url_is_an_error() {
    let err = resolve_config(&ConfigOverrides::default(), None, env_from(&[]))
        .expect_err("base url required");
    assert!(err.to_string().contains("base URL missing"));
}

#[test]
fn invalid_env_number_is_reported() {
    let err = resolve_config(
        &ConfigOverrides::default(),
        Some(&file_with_base("http://x")),
        env_from(&[(ENV_TIMEOUT_MS, "soon")]),
    )
    .expect_err("bad number");
    assert!(err.to_string().contains(ENV_TIMEOUT_MS));
}

#[test]
fn validation_rejects_bad_scheme_and_zero_timeout() {
    let err = resolve_config(
        &ConfigOverrides::default(),
        Some(&file_with_base("ftp://x")),
        env_from(&[]),
    )
    .expect_err("scheme");
    assert!(err.to_string().contains("http://"));

    let overrides = ConfigOverrides {
        timeout_ms: Some(0),
        ..ConfigOverrides::default()
    };
    let err = resolve_config(&overrides, Some(&file_with_base("http://x")), env_from(&[]))
        .expect_err("zero timeout");
    assert!(err.to_string().contains("timeout_ms"));
}

#[test]
fn config_file_rejects_unknown_fields_and_wrong_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");

    std::fs::write(&path, r#"{"schema_version": 1, "base_url": "http://x", "colour": "red"}"#)
        .expect("write config");
    let err = load_config_file(&path).expect_err("unknown field");
    assert!(format!("{err:#}").contains("colour"));

    std::fs::write(&path, r#"{"schema_version": 2, "base_url": "http://x"}"#)
        .expect("write config");
    let err = load_config_file(&path).expect_err("schema version");
    assert!(err.to_string().contains("schema_version 2"));

    std::fs::write(
        &path,
        r#"{"schema_version": 1, "base_url": "http://x", "region": "northeurope"}"#,
    )
    .expect("write config");
    let file = load_config_file(&path).expect("valid config");
    assert_eq!(file.region.as_deref(), Some("northeurope"));
}
