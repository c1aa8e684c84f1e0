//! reqwest-backed adapters for the three plan providers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use triad_core::config::ProvidersConfig;
use triad_core::domain::provider::MAX_ERROR_CHARS;
use triad_core::errors::ProviderError;
use triad_core::redact::{bounded, redact_pii};

use crate::provider::PlanProvider;

pub mod anthropic;
pub mod openai;
pub mod vertex;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use vertex::VertexProvider;

pub const SYSTEM_INSTRUCTION: &str =
    "Return ONLY valid JSON matching the Plan schema described in the prompt. No markdown.";
pub const TEMPERATURE: f64 = 0.2;

pub fn http_client(timeout_secs: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|error| ProviderError::Transport(format!("http client setup failed: {error}")))
}

/// Builds the three adapters in round order from configuration.
pub fn build_providers(
    config: &ProvidersConfig,
) -> Result<[Arc<dyn PlanProvider>; 3], ProviderError> {
    let client = http_client(config.timeout_secs)?;
    Ok([
        Arc::new(OpenAiProvider::from_config(client.clone(), &config.openai)?),
        Arc::new(VertexProvider::from_config(client.clone(), &config.vertex)?),
        Arc::new(AnthropicProvider::from_config(client, &config.anthropic)?),
    ])
}

pub(crate) async fn send_json(label: &str, request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|error| ProviderError::Transport(format!("{label} request failed: {error}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(label, status.as_u16(), &body));
    }

    response.json::<Value>().await.map_err(|error| {
        ProviderError::Transport(format!("{label} returned an unreadable body: {error}"))
    })
}

pub(crate) fn status_error(label: &str, status: u16, body: &str) -> ProviderError {
    let message = format!("{label} {status}: {}", bounded(&redact_pii(body), MAX_ERROR_CHARS));
    match status {
        401 | 403 => ProviderError::Auth(message),
        _ => ProviderError::Transport(message),
    }
}

/// Joins the non-empty `text` members of a content-part array.
pub(crate) fn join_text_parts(parts: Option<&Value>) -> String {
    parts
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

pub(crate) fn missing_credential(label: &str, key: &str) -> ProviderError {
    ProviderError::Auth(format!("{label} is not configured: missing {key}"))
}
