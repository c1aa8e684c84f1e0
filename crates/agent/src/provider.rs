use async_trait::async_trait;

use triad_core::domain::provider::ProviderKind;
use triad_core::errors::ProviderError;

/// One plan-generating backend. Implementations own their transport and
/// credentials; the orchestrator only sees the completed text.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
