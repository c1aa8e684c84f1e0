//! Triad core: the deterministic half of the quorum plan gateway.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! configuration loading. Provider transport, persistence and the round
//! orchestration itself live in `triad-db` and `triad-agent`.
//!
//! # Key Types
//!
//! - `Plan` - the validated, fully defaulted change proposal
//! - `ProviderResult` - one provider's isolated outcome for a round
//! - `QuorumDecision` - majority-by-hash reduction over the three results
//! - `AuditRecord` / `ModuleRecord` - the two durable records

pub mod audit;
pub mod canonical;
pub mod config;
pub mod constraints;
pub mod domain;
pub mod errors;
pub mod quorum;
pub mod redact;
pub mod schema;

pub use audit::{AuditRecord, ProviderOutcome, RawProviderText, RunId};
pub use canonical::{canonicalize, plan_hash, sha256_hex};
pub use constraints::{
    BudgetConstraintValidator, BudgetKind, ConstraintValidator, ConstraintViolation,
};
pub use domain::module::{ModuleId, ModuleRecord, ModuleStatus};
pub use domain::plan::{parse_plan, PatchOp, PatchStep, Plan, ReadSpec, WriteOp, WriteSpec};
pub use domain::provider::{ProviderKind, ProviderResult};
pub use errors::{InterfaceError, OrchestrationError, PlanError, ProviderError};
pub use quorum::{decide, QuorumDecision, QUORUM_THRESHOLD};
pub use redact::{bounded, redact_pii};
pub use schema::{
    CollectionSummary, SchemaOverride, SchemaSnapshot, SchemaSnapshotSource, StaticSchemaSnapshot,
};
