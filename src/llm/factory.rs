use anyhow::{bail, Result};
use tracing::debug;

use super::client::{GenerationClient, MockGenerationClient};
use super::client_impl::{AnthropicClient, GeminiClient, OpenAIClient};
use crate::config::Config;

/// Create a generation client based on configuration
pub fn create_client(config: &Config, dry_run: bool) -> Result<Box<dyn GenerationClient>> {
    if dry_run {
        debug!("Using mock generation client");
        return Ok(Box::new(MockGenerationClient::new()));
    }

    let llm = &config.llm;
    let api_key = config.get_api_key()?;
    let max_tokens = llm.get_max_tokens();
    let timeout = llm.timeout_secs;

    match llm.provider.as_str() {
        "anthropic" => Ok(Box::new(match &llm.base_url {
            Some(url) => AnthropicClient::with_base_url(api_key, url.clone(), max_tokens, timeout)?,
            None => AnthropicClient::new(api_key, max_tokens, timeout)?,
        })),

        "openai" => Ok(Box::new(OpenAIClient::new(api_key, max_tokens, timeout)?)),

        "openai-compatible" => {
            let base_url = llm
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434/v1".to_string());

            Ok(Box::new(OpenAIClient::with_base_url(
                api_key, base_url, max_tokens, timeout,
            )?))
        }

        "gemini" => Ok(Box::new(GeminiClient::new(api_key, max_tokens, timeout)?)),

        unknown => bail!("Unknown LLM provider: {}", unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_create_mock_client_for_dry_run() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("PROMPTWRIGHT_TEST_UNSET_KEY".to_string());
        // dry run never looks at the key
        create_client(&config, true).unwrap();
    }

    #[test]
    #[serial]
    fn test_create_known_providers() {
        env::set_var("AI_API_KEY", "test_key");
        for provider in ["anthropic", "openai", "openai-compatible", "gemini"] {
            let mut config = Config::default();
            config.llm.provider = provider.to_string();
            assert!(create_client(&config, false).is_ok(), "{}", provider);
        }
        env::remove_var("AI_API_KEY");
    }

    #[test]
    #[serial]
    fn test_create_client_with_unknown_provider() {
        env::set_var("AI_API_KEY", "test_key");
        let mut config = Config::default();
        config.llm.provider = "unknown_provider".to_string();
        let err = create_client(&config, false).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
        env::remove_var("AI_API_KEY");
    }

    #[test]
    fn test_create_client_without_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("PROMPTWRIGHT_TEST_NONEXISTENT_KEY_99999".to_string());
        let err = create_client(&config, false).err().unwrap();
        assert!(err.to_string().contains("API key not found"));
    }
}
