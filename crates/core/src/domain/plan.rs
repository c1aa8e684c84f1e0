//! The Plan contract and its validating constructor.
//!
//! Provider output is untrusted. `parse_plan` is the only way text becomes a
//! `Plan`: JSON syntax is checked first, then the structure is deserialized
//! with every optional field defaulted, then the remaining range rules are
//! enforced. Unknown keys are dropped and never reach the canonical form.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::errors::PlanError;

pub const PLAN_CONTRACT_VERSION: &str = "1.5.0";
pub const DEFAULT_READ_LIMIT: u32 = 50;
pub const MAX_READ_LIMIT: u32 = 200;
pub const DEFAULT_ADDED_GZIP_BYTES_MAX: u64 = 5_000;
pub const DEFAULT_TTI_IMPACT_MS_MAX: u64 = 10;
pub const DEFAULT_READS_PER_ACTION_MAX: u64 = 2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub version: String,
    pub ui: UiSection,
    pub db: DbSection,
    pub ps: PsSection,
    pub constraints: PlanConstraints,
    pub meta: PlanMeta,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            version: PLAN_CONTRACT_VERSION.to_string(),
            ui: UiSection::default(),
            db: DbSection::default(),
            ps: PsSection::default(),
            constraints: PlanConstraints::default(),
            meta: PlanMeta::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSection {
    pub patches: Vec<PatchStep>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSection {
    pub reads: Vec<ReadSpec>,
    pub writes: Vec<WriteSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsSection {
    pub steps: Vec<PatchStep>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchOp {
    CreateOrReplace,
    InsertBefore,
    InsertAfter,
    DeleteRange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchStep {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_start_anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_end_anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Hash of the content the step expects to find at `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// `[field, operator, value]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhereClause(pub String, pub String, pub Value);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadSpec {
    pub collection: String,
    #[serde(default, rename = "where")]
    pub filters: Vec<WhereClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default = "default_read_limit", deserialize_with = "integral")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_after: Option<Value>,
}

fn default_read_limit() -> u32 {
    DEFAULT_READ_LIMIT
}

/// Accepts any non-negative JSON number with no fractional part, so `2` and
/// `2.0` decode to the same value.
fn integral<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let number = Number::deserialize(deserializer)?;
    let whole = number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= u64::MAX as f64)
            .map(|value| value as u64)
    });
    let whole = whole.ok_or_else(|| {
        D::Error::custom(format!("expected a non-negative integer, found {number}"))
    })?;
    T::try_from(whole).map_err(|_| D::Error::custom(format!("integer {whole} is out of range")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOp {
    Set,
    Update,
    Delete,
    Batch,
    Transaction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSpec {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    pub op: WriteOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanConstraints {
    #[serde(rename = "wcagAA")]
    pub wcag_aa: bool,
    pub least_privilege: bool,
    pub perf: PerfBudget,
}

impl Default for PlanConstraints {
    fn default() -> Self {
        Self { wcag_aa: true, least_privilege: true, perf: PerfBudget::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerfBudget {
    #[serde(deserialize_with = "integral")]
    pub added_gzip_bytes_max: u64,
    #[serde(deserialize_with = "integral")]
    pub tti_impact_ms_max: u64,
    #[serde(deserialize_with = "integral")]
    pub reads_per_action_max: u64,
}

impl Default for PerfBudget {
    fn default() -> Self {
        Self {
            added_gzip_bytes_max: DEFAULT_ADDED_GZIP_BYTES_MAX,
            tti_impact_ms_max: DEFAULT_TTI_IMPACT_MS_MAX,
            reads_per_action_max: DEFAULT_READS_PER_ACTION_MAX,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanMeta {
    pub summary: String,
    pub risks: Vec<String>,
    pub verification: Vec<String>,
}

/// Parses untrusted provider text into a fully defaulted `Plan`.
pub fn parse_plan(text: &str) -> Result<Plan, PlanError> {
    let value: Value =
        serde_json::from_str(text).map_err(|error| PlanError::Parse(error.to_string()))?;

    if !value.is_object() {
        return Err(PlanError::Schema("plan document must be a JSON object".to_string()));
    }

    let plan: Plan =
        serde_json::from_value(value).map_err(|error| PlanError::Schema(error.to_string()))?;
    plan.validate()?;
    Ok(plan)
}

impl Plan {
    /// Range rules serde cannot express on its own.
    pub fn validate(&self) -> Result<(), PlanError> {
        for (index, step) in self.ui.patches.iter().enumerate() {
            validate_step("ui.patches", index, step)?;
        }
        for (index, step) in self.ps.steps.iter().enumerate() {
            validate_step("ps.steps", index, step)?;
        }

        for (index, read) in self.db.reads.iter().enumerate() {
            if read.limit == 0 || read.limit > MAX_READ_LIMIT {
                return Err(PlanError::Schema(format!(
                    "db.reads[{index}].limit must be in range 1..={MAX_READ_LIMIT}, found {}",
                    read.limit
                )));
            }
        }

        Ok(())
    }

    pub fn total_patch_content_chars(&self) -> u64 {
        self.ui
            .patches
            .iter()
            .filter_map(|patch| patch.content.as_deref())
            .map(|content| content.chars().count() as u64)
            .sum()
    }
}

fn validate_step(section: &str, index: usize, step: &PatchStep) -> Result<(), PlanError> {
    if step.path.is_empty() {
        return Err(PlanError::Schema(format!("{section}[{index}].path must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_plan, PatchOp, Plan, WriteOp, PLAN_CONTRACT_VERSION};
    use crate::canonical::plan_hash;
    use crate::errors::PlanError;

    #[test]
    fn empty_object_yields_fully_defaulted_plan() {
        let plan = parse_plan("{}").expect("empty object is a valid plan");

        assert!(plan.ui.patches.is_empty());
        assert!(plan.db.reads.is_empty());
        assert!(plan.db.writes.is_empty());
        assert!(plan.ps.steps.is_empty());
        assert_eq!(plan.constraints.perf.reads_per_action_max, 2);
        assert_eq!(plan.constraints.perf.added_gzip_bytes_max, 5_000);
        assert_eq!(plan.constraints.perf.tti_impact_ms_max, 10);
        assert!(plan.constraints.wcag_aa);
        assert!(plan.constraints.least_privilege);
        assert_eq!(plan.version, PLAN_CONTRACT_VERSION);
        assert_eq!(plan, Plan::default());
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let error = parse_plan("```json\n{}\n```").expect_err("markdown fence is not JSON");
        assert!(matches!(error, PlanError::Parse(_)));
    }

    #[test]
    fn non_object_documents_are_schema_errors() {
        for text in ["[]", "42", "\"plan\"", "null"] {
            let error = parse_plan(text).expect_err("non-object should fail");
            assert!(matches!(error, PlanError::Schema(_)), "unexpected error for {text}");
        }
    }

    #[test]
    fn unknown_patch_op_is_schema_error() {
        let error = parse_plan(r#"{"ui":{"patches":[{"op":"REWRITE","path":"src/App.jsx"}]}}"#)
            .expect_err("unknown op");
        assert!(matches!(error, PlanError::Schema(_)));
    }

    #[test]
    fn empty_patch_path_is_schema_error() {
        let error = parse_plan(r#"{"ps":{"steps":[{"op":"DELETE_RANGE","path":""}]}}"#)
            .expect_err("empty path");
        assert!(matches!(error, PlanError::Schema(ref message) if message.contains("ps.steps[0]")));
    }

    #[test]
    fn read_limit_out_of_range_is_schema_error() {
        let error = parse_plan(r#"{"db":{"reads":[{"collection":"products","limit":500}]}}"#)
            .expect_err("limit too large");
        assert!(matches!(error, PlanError::Schema(ref message) if message.contains("limit")));
    }

    #[test]
    fn negative_budget_is_schema_error() {
        let error = parse_plan(r#"{"constraints":{"perf":{"readsPerActionMax":-1}}}"#)
            .expect_err("negative budget");
        assert!(matches!(error, PlanError::Schema(_)));
    }

    #[test]
    fn integral_floats_decode_like_integers() {
        let float_budget = parse_plan(r#"{"constraints":{"perf":{"readsPerActionMax":2.0}}}"#)
            .expect("2.0 is an integer budget");
        let int_budget = parse_plan(r#"{"constraints":{"perf":{"readsPerActionMax":2}}}"#)
            .expect("2 is an integer budget");

        assert_eq!(float_budget, int_budget);
        assert_eq!(
            plan_hash(&float_budget).expect("hash float"),
            plan_hash(&int_budget).expect("hash int")
        );

        let plan = parse_plan(r#"{"db":{"reads":[{"collection":"products","limit":20.0}]}}"#)
            .expect("20.0 is an integer limit");
        assert_eq!(plan.db.reads[0].limit, 20);
    }

    #[test]
    fn fractional_numbers_are_schema_errors() {
        for text in [
            r#"{"constraints":{"perf":{"ttiImpactMsMax":2.5}}}"#,
            r#"{"db":{"reads":[{"collection":"products","limit":20.5}]}}"#,
            r#"{"constraints":{"perf":{"addedGzipBytesMax":"5000"}}}"#,
        ] {
            let error = parse_plan(text).expect_err("non-integral value should fail");
            assert!(matches!(error, PlanError::Schema(_)), "unexpected error for {text}");
        }
    }

    #[test]
    fn full_document_parses_with_wire_names() {
        let plan = parse_plan(
            r#"{
                "ui": {"patches": [{
                    "op": "INSERT_AFTER",
                    "path": "src/components/Sidebar.jsx",
                    "anchor": "{/* menu */}",
                    "content": "<MenuItem to=\"/ai\" />",
                    "sha256": "abc"
                }]},
                "db": {
                    "reads": [{"collection": "products", "where": [["active", "==", true]], "orderBy": "name", "limit": 20}],
                    "writes": [{"collection": "modules", "docId": "admin-ai-module", "op": "set", "payload": {"status": "READY"}}]
                },
                "constraints": {"wcagAA": false, "perf": {"readsPerActionMax": 1}},
                "meta": {"summary": "add AI menu", "risks": ["nav regression"], "extra": 1}
            }"#,
        )
        .expect("full plan");

        assert_eq!(plan.ui.patches[0].op, PatchOp::InsertAfter);
        assert_eq!(plan.db.reads[0].filters[0].0, "active");
        assert_eq!(plan.db.reads[0].limit, 20);
        assert_eq!(plan.db.writes[0].op, WriteOp::Set);
        assert_eq!(plan.db.writes[0].doc_id.as_deref(), Some("admin-ai-module"));
        assert!(!plan.constraints.wcag_aa);
        assert_eq!(plan.constraints.perf.reads_per_action_max, 1);
        assert_eq!(plan.constraints.perf.added_gzip_bytes_max, 5_000);
        assert_eq!(plan.meta.summary, "add AI menu");
        assert_eq!(plan.total_patch_content_chars(), 21);

        let round_tripped = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(round_tripped["constraints"]["wcagAA"], false);
        assert_eq!(round_tripped["db"]["reads"][0]["where"][0][2], true);
        assert!(round_tripped["meta"].get("extra").is_none());
    }

    #[test]
    fn where_clause_must_be_a_triple() {
        let error = parse_plan(r#"{"db":{"reads":[{"collection":"products","where":[["active"]]}]}}"#)
            .expect_err("short where clause");
        assert!(matches!(error, PlanError::Schema(_)));
    }
}
