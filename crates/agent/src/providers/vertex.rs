use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use triad_core::config::VertexConfig;
use triad_core::domain::provider::ProviderKind;
use triad_core::errors::ProviderError;

use super::{join_text_parts, missing_credential, send_json, SYSTEM_INSTRUCTION, TEMPERATURE};
use crate::provider::PlanProvider;

/// Vertex AI Gemini `generateContent`, authenticated with a pre-issued
/// OAuth access token.
pub struct VertexProvider {
    client: Client,
    access_token: SecretString,
    project: String,
    location: String,
    model: String,
    base_url: String,
}

impl VertexProvider {
    pub fn new(
        client: Client,
        access_token: SecretString,
        project: impl Into<String>,
        location: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let location = location.into();
        let base_url = format!("https://{location}-aiplatform.googleapis.com");
        Self {
            client,
            access_token,
            project: project.into(),
            location,
            model: model.into(),
            base_url,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_config(client: Client, config: &VertexConfig) -> Result<Self, ProviderError> {
        let project = config
            .project
            .clone()
            .filter(|project| !project.trim().is_empty())
            .ok_or_else(|| missing_credential("Vertex", "providers.vertex.project"))?;
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| missing_credential("Vertex", "providers.vertex.access_token"))?;

        let provider = Self::new(
            client,
            access_token,
            project,
            config.location.clone(),
            config.model.clone(),
        );
        Ok(match &config.base_url {
            Some(base_url) => provider.with_base_url(base_url.clone()),
            None => provider,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.project,
            self.location,
            self.model
        )
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": TEMPERATURE },
        })
    }
}

fn extract_text(body: &Value) -> String {
    join_text_parts(body.pointer("/candidates/0/content/parts"))
}

#[async_trait]
impl PlanProvider for VertexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vertex
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.access_token.expose_secret())
            .json(&self.request_body(prompt));
        let body = send_json("Vertex", request).await?;
        Ok(extract_text(&body))
    }
}
