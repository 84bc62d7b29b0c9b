use std::io::Write;

use gamma_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[agent]
max_steps = 10
system_prompt = "You are a careful assistant."

[memory]
token_budget = 2000
keep_recent = 3
enable_summarization = false

[storage]
snapshot_file = "/tmp/gamma-test/state.json"
snapshot_key = "executions"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.agent.max_steps, 10);
    assert_eq!(
        config.agent.system_prompt.as_deref(),
        Some("You are a careful assistant.")
    );
    assert_eq!(config.memory.token_budget, 2000);
    assert_eq!(config.memory.keep_recent, 3);
    assert!(!config.memory.enable_summarization);
    assert_eq!(config.storage.snapshot_file, "/tmp/gamma-test/state.json");
    assert_eq!(config.storage.snapshot_key, "executions");
}

#[test]
fn test_defaults_from_empty_config() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.agent.max_steps, 30);
    assert!(config.agent.system_prompt.is_none());
    assert_eq!(config.memory.token_budget, 4000);
    assert_eq!(config.memory.keep_recent, 5);
    assert!(config.memory.enable_summarization);
    assert_eq!(config.storage.snapshot_file, "gamma_state.json");
    assert_eq!(config.storage.snapshot_key, "workflow_executions");
}

#[test]
fn test_missing_file_is_an_error() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/gamma.toml")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}
