use triad_core::canonical::canonicalize;
use triad_core::errors::OrchestrationError;
use triad_core::schema::{SchemaOverride, SchemaSnapshot};

/// Fixed product context shared by every round. Changing it changes what the
/// providers are asked, so it is versioned with the plan contract.
pub const PLAN_CONTEXT: &str = "\
Boots POS Admin AI Module (v1.5.0)
Hard constraints:
- Perf budget: <= 5KB gzip added, <= 10ms TTI impact, <= 2 data-store reads per action
- WCAG AA required
- Least privilege; no client-side secrets
- Data-store I/O: pagination (limit + startAfter), batch/transaction writes, compact payloads
- RBAC per menu: defaultRoles, allowedRoles, allowedUsers; enforce server-side + filter client
- Quorum: require 2/3 normalized plan match (hash equality)
Output MUST match Plan schema exactly as JSON.";

/// Builds the single prompt sent, byte for byte, to all three providers.
///
/// The snapshot and override are serialized canonically so that two rounds
/// over the same inputs produce the same prompt.
pub fn build_prompt(
    intent: &str,
    snapshot: &SchemaSnapshot,
    schema_override: Option<&SchemaOverride>,
) -> Result<String, OrchestrationError> {
    let snapshot_json = serde_json::to_value(snapshot)
        .map_err(|error| OrchestrationError::Snapshot(error.to_string()))?;
    let override_json = match schema_override {
        Some(value) => serde_json::to_value(value)
            .map_err(|error| OrchestrationError::InvalidRequest(error.to_string()))?,
        None => serde_json::Value::Object(serde_json::Map::new()),
    };

    Ok(format!(
        "{PLAN_CONTEXT}\n\nIntent:\n{intent}\n\nSchema Snapshot:\n{}\n\nAdmin Override (optional):\n{}\n\nReturn ONLY JSON matching Plan schema.",
        canonicalize(&snapshot_json),
        canonicalize(&override_json),
    ))
}
