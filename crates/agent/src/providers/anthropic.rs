use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use triad_core::config::AnthropicConfig;
use triad_core::domain::provider::ProviderKind;
use triad_core::errors::ProviderError;

use super::{join_text_parts, missing_credential, send_json, SYSTEM_INSTRUCTION, TEMPERATURE};
use crate::provider::PlanProvider;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API (`POST {base_url}/messages`).
pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        client: Client,
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self { client, api_key, model: model.into(), base_url: base_url.into(), max_tokens }
    }

    pub fn from_config(client: Client, config: &AnthropicConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential("Anthropic", "providers.anthropic.api_key"))?;
        Ok(Self::new(
            client,
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.max_tokens,
        ))
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": TEMPERATURE,
            "system": SYSTEM_INSTRUCTION,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

#[async_trait]
impl PlanProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt));
        let body = send_json("Anthropic", request).await?;
        Ok(join_text_parts(body.get("content")))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Client;

    use super::AnthropicProvider;

    #[test]
    fn request_uses_configured_token_budget() {
        let provider = AnthropicProvider::new(
            Client::new(),
            "sk-ant".to_string().into(),
            "claude-3-5-sonnet-20240620",
            "https://api.anthropic.com/v1",
            4096,
        );

        let body = provider.request_body("Intent: x");

        assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body["system"].as_str().is_some_and(|s| s.contains("ONLY valid JSON")));
    }
}
