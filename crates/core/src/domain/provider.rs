use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical::plan_hash;
use crate::domain::plan::{parse_plan, Plan};
use crate::errors::ProviderError;
use crate::redact::{bounded, redact_pii};

pub const MAX_RAW_TEXT_CHARS: usize = 50_000;
pub const MAX_ERROR_CHARS: usize = 2_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Vertex,
    Anthropic,
}

impl ProviderKind {
    /// Dispatch order of a round. Audit records list providers in this order.
    pub const ROUND_ORDER: [ProviderKind; 3] = [Self::OpenAi, Self::Vertex, Self::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Vertex => "vertex",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "vertex" => Some(Self::Vertex),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider's outcome for one round.
///
/// Built only through [`ProviderResult::from_completion`] or
/// [`ProviderResult::failed`], which apply redaction and length bounds; the
/// fields are read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderResult {
    provider: ProviderKind,
    ok: bool,
    raw_text: String,
    plan: Option<Plan>,
    hash: Option<String>,
    error: Option<String>,
}

impl ProviderResult {
    /// Validates, canonicalizes and hashes a settled provider call. Every
    /// failure is folded into an `ok = false` result.
    pub fn from_completion(
        provider: ProviderKind,
        completion: Result<String, ProviderError>,
    ) -> Self {
        let text = match completion {
            Ok(text) => text,
            Err(error) => return Self::failed(provider, &error.to_string()),
        };

        let evaluated = parse_plan(&text).and_then(|plan| plan_hash(&plan).map(|hash| (plan, hash)));
        match evaluated {
            Ok((plan, hash)) => Self {
                provider,
                ok: true,
                raw_text: bounded(&redact_pii(&text), MAX_RAW_TEXT_CHARS),
                plan: Some(plan),
                hash: Some(hash),
                error: None,
            },
            Err(error) => Self::failed(provider, &error.to_string()),
        }
    }

    pub fn failed(provider: ProviderKind, error: &str) -> Self {
        Self {
            provider,
            ok: false,
            raw_text: String::new(),
            plan: None,
            hash: None,
            error: Some(bounded(&redact_pii(error), MAX_ERROR_CHARS)),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
