use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::analysis::PatternThresholds;
use crate::benchmark::RunPolicy;
use crate::validate::ValidationRules;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub analysis: PatternThresholds,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub validate: ValidationRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>, // For OpenAI-compatible APIs

    /// Optional: Override max_tokens for generation requests
    /// If not specified, uses provider-specific defaults:
    /// - anthropic: 4096
    /// - openai: 4096
    /// - openai-compatible (ollama): 16384
    /// - gemini: 8192
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// HTTP timeout per request in seconds (default: 120)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Get max_tokens value, using provider-specific default if not specified
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }

        match self.provider.as_str() {
            "anthropic" => 4096,
            "openai" => 4096,
            "openai-compatible" => 16384, // ollama and similar
            "gemini" => 8192,
            _ => 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Root directory holding `<provider>/<model>.md` files (default: "collections")
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,

    /// Directory names under the root that are not providers (default: ["docs"])
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            excluded_dirs: default_excluded_dirs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of abstraction levels to run, 1..=5 with the default ladder (default: 5)
    #[serde(default = "default_levels")]
    pub levels: usize,

    /// "independent" or "cascade" (default: "independent")
    #[serde(default = "default_policy")]
    pub policy: String,

    /// Maximum in-flight generation requests (default: 4)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Abort the whole run after this many seconds (default: 300)
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: Option<u64>,

    /// Replaces the built-in refusal indicators when set
    #[serde(default)]
    pub refusal_indicators: Option<Vec<String>>,

    /// Phrases used when none are given on the command line
    #[serde(default = "default_test_phrases")]
    pub test_phrases: Vec<String>,

    /// Optional: model used for benchmark calls (default: llm.model)
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            policy: default_policy(),
            concurrency: default_concurrency(),
            run_timeout_secs: default_run_timeout(),
            refusal_indicators: None,
            test_phrases: default_test_phrases(),
            model: None,
        }
    }
}

impl BenchmarkConfig {
    /// Parse the policy string into a RunPolicy
    pub fn get_policy(&self) -> RunPolicy {
        match self.policy.to_lowercase().as_str() {
            "cascade" | "sequential" => RunPolicy::Cascade,
            _ => RunPolicy::Independent, // Default
        }
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_corpus_root() -> PathBuf {
    PathBuf::from("collections")
}

fn default_excluded_dirs() -> Vec<String> {
    vec!["docs".to_string()]
}

fn default_levels() -> usize {
    5
}

fn default_policy() -> String {
    "independent".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_run_timeout() -> Option<u64> {
    Some(300)
}

fn default_test_phrases() -> Vec<String> {
    vec![
        "Explain this concept simply".to_string(),
        "What are the key points?".to_string(),
        "Provide an example".to_string(),
    ]
}

impl Config {
    /// Load config from the working directory or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        if let Ok(config) = Self::load_from_path("promptwright.toml") {
            debug!("Loaded config from ./promptwright.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("promptwright").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get API key from environment variable specified in config
    pub fn get_api_key(&self) -> Result<String> {
        match &self.llm.api_key_env {
            Some(env_var) => {
                // "none" means no API key needed (e.g., Ollama)
                if env_var.to_lowercase() == "none" {
                    return Ok(String::new());
                }

                // openai-compatible: local models don't need keys, gateways do
                if self.llm.provider == "openai-compatible" {
                    return Ok(env::var(env_var).unwrap_or_default());
                }

                env::var(env_var).map_err(|_| {
                    anyhow::anyhow!("API key not found in environment variable: {}", env_var)
                })
            }
            None => Ok(String::new()),
        }
    }

    /// Model used for benchmark requests
    pub fn benchmark_model(&self) -> &str {
        self.benchmark.model.as_deref().unwrap_or(&self.llm.model)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: "anthropic".to_string(),
                model: "claude-sonnet-4-20250514".to_string(),
                api_key_env: Some("AI_API_KEY".to_string()),
                base_url: None,
                max_tokens: None,
                timeout_secs: default_timeout_secs(),
            },
            corpus: CorpusConfig::default(),
            analysis: PatternThresholds::default(),
            benchmark: BenchmarkConfig::default(),
            validate: ValidationRules::default(),
        }
    }
}
