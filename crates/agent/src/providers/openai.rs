use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use triad_core::config::OpenAiConfig;
use triad_core::domain::provider::ProviderKind;
use triad_core::errors::ProviderError;

use super::{join_text_parts, missing_credential, send_json, SYSTEM_INSTRUCTION, TEMPERATURE};
use crate::provider::PlanProvider;

/// OpenAI Responses API (`POST {base_url}/responses`).
pub struct OpenAiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        client: Client,
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self { client, api_key, model: model.into(), base_url: base_url.into() }
    }

    pub fn from_config(client: Client, config: &OpenAiConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential("OpenAI", "providers.openai.api_key"))?;
        Ok(Self::new(client, api_key, config.model.clone(), config.base_url.clone()))
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "input": [
                { "role": "system", "content": SYSTEM_INSTRUCTION },
                { "role": "user", "content": prompt },
            ],
            "temperature": TEMPERATURE,
        })
    }
}

/// Prefers the aggregated `output_text`, falling back to the message items.
fn extract_text(body: &Value) -> String {
    if let Some(text) = body.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }
    body.get("output")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| join_text_parts(item.get("content")))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

#[async_trait]
impl PlanProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(prompt));
        let body = send_json("OpenAI", request).await?;
        Ok(extract_text(&body))
    }
}
