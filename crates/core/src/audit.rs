use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::module::ModuleId;
use crate::domain::provider::{ProviderKind, ProviderResult};
use crate::quorum::QuorumDecision;
use crate::redact::{bounded, redact_pii};

pub const MAX_AUDIT_INTENT_CHARS: usize = 5_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutcome {
    pub provider: ProviderKind,
    pub ok: bool,
    pub hash: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProviderText {
    pub provider: ProviderKind,
    pub raw_text: String,
}

/// Forensic record of one orchestration round. Written exactly once per
/// round, whatever the outcome, and never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub run_id: RunId,
    pub module_id: ModuleId,
    pub actor_id: String,
    pub intent: String,
    pub providers: Vec<ProviderOutcome>,
    pub quorum_ok: bool,
    pub winning_hash: Option<String>,
    pub latency_ms: u64,
    pub raw_per_provider: Vec<RawProviderText>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_round(
        run_id: RunId,
        module_id: ModuleId,
        actor_id: impl Into<String>,
        intent: &str,
        results: &[ProviderResult],
        decision: &QuorumDecision<'_>,
        latency_ms: u64,
    ) -> Self {
        Self {
            run_id,
            module_id,
            actor_id: actor_id.into(),
            intent: bounded(&redact_pii(intent), MAX_AUDIT_INTENT_CHARS),
            providers: results
                .iter()
                .map(|result| ProviderOutcome {
                    provider: result.provider(),
                    ok: result.ok(),
                    hash: result.hash().map(str::to_owned),
                    error: result.error().map(str::to_owned),
                })
                .collect(),
            quorum_ok: decision.ok,
            winning_hash: decision.winning_hash().map(str::to_owned),
            latency_ms,
            raw_per_provider: results
                .iter()
                .map(|result| RawProviderText {
                    provider: result.provider(),
                    raw_text: result.raw_text().to_owned(),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }
}
