use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::RunId;
use crate::domain::plan::Plan;

pub const DEFAULT_MODULE_ID: &str = "admin-ai-module";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub String);

impl Default for ModuleId {
    fn default() -> Self {
        Self(DEFAULT_MODULE_ID.to_string())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleStatus {
    Ready,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "READY" => Some(Self::Ready),
            _ => None,
        }
    }
}

/// Current-state pointer for a module. Only the plan committer writes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub module_id: ModuleId,
    pub version: String,
    pub status: ModuleStatus,
    pub last_run_id: RunId,
    pub plan: Plan,
    pub updated_at: DateTime<Utc>,
    /// Number of commits applied; the compare-and-swap token.
    pub revision: u64,
}

impl ModuleRecord {
    /// Next state of the pointer after committing `plan` from round `run_id`.
    pub fn committed(
        module_id: ModuleId,
        run_id: RunId,
        plan: Plan,
        version: impl Into<String>,
        previous_revision: u64,
    ) -> Self {
        Self {
            module_id,
            version: version.into(),
            status: ModuleStatus::Ready,
            last_run_id: run_id,
            plan,
            updated_at: Utc::now(),
            revision: previous_revision.saturating_add(1),
        }
    }
}
