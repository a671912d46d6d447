//! Configuration loading and defaults

use anyhow::Result;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use promptwright::benchmark::RunPolicy;
use promptwright::config::Config;

#[test]
fn test_config_has_defaults() -> Result<()> {
    let config = Config::default();

    assert!(!config.llm.provider.is_empty());
    assert!(!config.llm.model.is_empty());
    assert_eq!(config.corpus.root, PathBuf::from("collections"));
    assert_eq!(config.benchmark.get_policy(), RunPolicy::Independent);
    assert_eq!(config.benchmark.run_timeout(), Some(Duration::from_secs(300)));
    assert!(config.benchmark.refusal_indicators.is_none());

    Ok(())
}

#[test]
fn test_load_with_explicit_path() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("promptwright.toml");
    fs::write(
        &path,
        r#"
[llm]
provider = "openai-compatible"
model = "llama3"
api_key_env = "none"
base_url = "http://localhost:11434/v1"

[corpus]
root = "/srv/templates"

[analysis]
min_headings_for_sectioned = 5

[benchmark]
levels = 3
policy = "cascade"
refusal_indicators = ["nope"]
model = "llama3:8b"
"#,
    )?;

    let config = Config::load_with_path(Some(path.display().to_string()))?;
    assert_eq!(config.llm.provider, "openai-compatible");
    assert_eq!(config.llm.get_max_tokens(), 16384);
    assert_eq!(config.corpus.root, PathBuf::from("/srv/templates"));
    assert_eq!(config.analysis.min_headings_for_sectioned, 5);
    assert_eq!(config.benchmark.levels, 3);
    assert_eq!(config.benchmark.get_policy(), RunPolicy::Cascade);
    assert_eq!(config.benchmark_model(), "llama3:8b");
    assert_eq!(config.get_api_key()?, "");

    Ok(())
}

#[test]
fn test_explicit_missing_path_is_an_error() {
    let result = Config::load_with_path(Some("/nonexistent/promptwright.toml".to_string()));
    assert!(result.is_err());
}

#[test]
fn test_benchmark_model_falls_back_to_llm_model() {
    let config = Config::default();
    assert_eq!(config.benchmark_model(), config.llm.model);
}

#[test]
#[serial]
fn test_api_key_env_var_not_set() {
    let mut config = Config::default();
    config.llm.api_key_env = Some("PROMPTWRIGHT_MISSING_KEY_XYZ".to_string());
    env::remove_var("PROMPTWRIGHT_MISSING_KEY_XYZ");
    assert!(config.get_api_key().is_err());
}
