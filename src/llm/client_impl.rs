use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::client::GenerationClient;
use crate::util::SecretString;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

// ============================================================================
// Anthropic Client
// ============================================================================

pub struct AnthropicClient {
    api_key: SecretString,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, max_tokens: u32, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(api_key, ANTHROPIC_BASE_URL.to_string(), max_tokens, timeout_secs)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            max_tokens,
            client: http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, system: Option<&str>, prompt: &str, model: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            system: system.map(str::to_string),
            messages: vec![ChatMessage::new("user", prompt)],
        };

        debug!("Calling Anthropic API with model: {}", model);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Anthropic API error {}: {}", status, error_text);
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|c| c.text.clone())
            .context("No content in Anthropic response")
    }
}

// ============================================================================
// OpenAI Client
// ============================================================================

pub struct OpenAIClient {
    api_key: SecretString,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: ChatMessage,
}

impl OpenAIClient {
    pub fn new(api_key: String, max_tokens: u32, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(api_key, OPENAI_BASE_URL.to_string(), max_tokens, timeout_secs)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            max_tokens,
            client: http_client(timeout_secs)?,
        })
    }

    fn request(&self, system: Option<&str>, prompt: &str, model: &str) -> OpenAIRequest {
        // GPT-5+ models use max_completion_tokens instead of max_tokens
        let (max_tokens, max_completion_tokens) = if model.starts_with("gpt-5") {
            (None, Some(self.max_tokens))
        } else {
            (Some(self.max_tokens), None)
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage::new("system", system));
        }
        messages.push(ChatMessage::new("user", prompt));

        OpenAIRequest {
            model: model.to_string(),
            messages,
            temperature: 0.7,
            max_tokens,
            max_completion_tokens,
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAIClient {
    async fn generate(&self, system: Option<&str>, prompt: &str, model: &str) -> Result<String> {
        let request = self.request(system, prompt, model);

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            self.base_url, model
        );

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json")
            .json(&request);

        // Only add authorization if API key is not empty
        if !self.api_key.expose().is_empty() && self.api_key.expose().to_lowercase() != "none" {
            req = req.header("authorization", format!("Bearer {}", self.api_key.expose()));
        }

        let response = req
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, error_text);
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .context("No choices in OpenAI response")
    }
}

// ============================================================================
// Gemini Client (Google Generative AI)
// ============================================================================

pub struct GeminiClient {
    api_key: SecretString,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: String, max_tokens: u32, timeout_secs: u64) -> Result<Self> {
        Self::with_base_url(api_key, GEMINI_BASE_URL.to_string(), max_tokens, timeout_secs)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            max_tokens,
            client: http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, system: Option<&str>, prompt: &str, model: &str) -> Result<String> {
        let request = GeminiRequest {
            system_instruction: system.map(GeminiContent::text),
            contents: vec![GeminiContent::text(prompt)],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            }),
        };

        debug!("Calling Gemini API with model: {}", model);

        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, error_text);
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        api_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .context("No content in Gemini response")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_request_carries_system_field() {
        let request = AnthropicRequest {
            model: "claude-3".to_string(),
            max_tokens: 4096,
            system: Some("You are X.".to_string()),
            messages: vec![ChatMessage::new("user", "test")],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-3");
        assert_eq!(json["system"], "You are X.");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_anthropic_request_omits_missing_system() {
        let request = AnthropicRequest {
            model: "claude-3".to_string(),
            max_tokens: 4096,
            system: None,
            messages: vec![ChatMessage::new("user", "test")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_openai_request_puts_system_first() {
        let client = OpenAIClient::new("k".to_string(), 4096, 120).unwrap();
        let json =
            serde_json::to_value(client.request(Some("You are X."), "hi", "gpt-4o")).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 4096);
        assert!(json.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_openai_request_gpt5_uses_max_completion_tokens() {
        let client = OpenAIClient::new("k".to_string(), 2048, 120).unwrap();
        let json = serde_json::to_value(client.request(None, "hi", "gpt-5-mini")).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["max_completion_tokens"], 2048);
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_gemini_request_structure() {
        let request = GeminiRequest {
            system_instruction: Some(GeminiContent::text("sys")),
            contents: vec![GeminiContent::text("test")],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: 8192,
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "test");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_response_parsing() {
        let anthropic: AnthropicResponse =
            serde_json::from_str(r#"{"content": [{"type": "text", "text": "Hello"}]}"#).unwrap();
        assert_eq!(anthropic.content[0].text, "Hello");

        let openai: OpenAIResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "Hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(openai.choices[0].message.content, "Hi");

        let gemini: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Hey"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(gemini.candidates[0].content.parts[0].text, "Hey");
    }

    #[tokio::test]
    async fn test_openai_compatible_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "I cannot do that."}}]}"#)
            .create_async()
            .await;

        let client =
            OpenAIClient::with_base_url("secret".to_string(), server.url(), 512, 30).unwrap();
        let reply = client
            .generate(Some("You are X."), "Do it", "local-model")
            .await
            .unwrap();

        assert_eq!(reply, "I cannot do that.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_compatible_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream down")
            .create_async()
            .await;

        let client = OpenAIClient::with_base_url("none".to_string(), server.url(), 512, 30).unwrap();
        let err = client.generate(None, "hi", "m").await.unwrap_err();
        assert!(err.to_string().contains("OpenAI API error 500"));
        assert!(err.to_string().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_anthropic_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "k")
            .with_status(200)
            .with_body(r#"{"content": [{"type": "text", "text": "Sure."}]}"#)
            .create_async()
            .await;

        let client = AnthropicClient::with_base_url("k".to_string(), server.url(), 256, 30).unwrap();
        let reply = client.generate(None, "hi", "claude-x").await.unwrap();
        assert_eq!(reply, "Sure.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gemini_empty_candidates_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("k".to_string(), server.url(), 256, 30).unwrap();
        let err = client.generate(None, "hi", "gemini-pro").await.unwrap_err();
        assert!(err.to_string().contains("No content in Gemini response"));
    }
}
