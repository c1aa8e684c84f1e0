//! One quorum round: prompt, fan-out, reduce, audit, gate, commit.
//!
//! The audit record is written after every round that reaches the reduce
//! step, before any error is returned. Provider failures never abort the
//! round; they become `ok = false` results and simply do not vote.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use triad_core::audit::{AuditRecord, RunId};
use triad_core::constraints::{BudgetConstraintValidator, ConstraintValidator};
use triad_core::domain::module::ModuleId;
use triad_core::domain::plan::Plan;
use triad_core::domain::provider::ProviderResult;
use triad_core::errors::OrchestrationError;
use triad_core::quorum::{decide, QUORUM_THRESHOLD};
use triad_core::redact::redact_pii;
use triad_core::schema::{SchemaOverride, SchemaSnapshotSource};
use triad_db::AuditRepository;

use crate::committer::PlanCommitter;
use crate::prompt::build_prompt;
use crate::provider::PlanProvider;

pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    #[serde(default)]
    pub module_id: ModuleId,
    pub intent: String,
    #[serde(default)]
    pub schema_override: Option<SchemaOverride>,
    pub actor_id: String,
}

impl OrchestrationRequest {
    pub fn new(intent: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            module_id: ModuleId::default(),
            intent: intent.into(),
            schema_override: None,
            actor_id: actor_id.into(),
        }
    }

    fn validate(&self) -> Result<(), OrchestrationError> {
        if self.intent.trim().is_empty() {
            return Err(OrchestrationError::InvalidRequest("intent must not be empty".into()));
        }
        if self.module_id.0.trim().is_empty() {
            return Err(OrchestrationError::InvalidRequest("module id must not be empty".into()));
        }
        if self.actor_id.trim().is_empty() {
            return Err(OrchestrationError::InvalidRequest("actor id must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationOutcome {
    pub run_id: RunId,
    pub module_id: ModuleId,
    pub plan: Plan,
}

pub struct QuorumOrchestrator {
    providers: [Arc<dyn PlanProvider>; 3],
    snapshots: Arc<dyn SchemaSnapshotSource>,
    audit: Arc<dyn AuditRepository>,
    committer: PlanCommitter,
    validator: Arc<dyn ConstraintValidator>,
    round_timeout: Duration,
}

impl QuorumOrchestrator {
    /// `providers` are dispatched and recorded in the order given.
    pub fn new(
        providers: [Arc<dyn PlanProvider>; 3],
        snapshots: Arc<dyn SchemaSnapshotSource>,
        audit: Arc<dyn AuditRepository>,
        committer: PlanCommitter,
    ) -> Self {
        Self {
            providers,
            snapshots,
            audit,
            committer,
            validator: Arc::new(BudgetConstraintValidator),
            round_timeout: DEFAULT_ROUND_TIMEOUT,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ConstraintValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_round_timeout(mut self, round_timeout: Duration) -> Self {
        self.round_timeout = round_timeout;
        self
    }

    pub async fn orchestrate(
        &self,
        request: OrchestrationRequest,
    ) -> Result<OrchestrationOutcome, OrchestrationError> {
        request.validate()?;

        let snapshot = self.snapshots.snapshot().await?;
        let prompt = build_prompt(&request.intent, &snapshot, request.schema_override.as_ref())?;
        let expected_revision = self.committer.current_revision(&request.module_id).await?;

        let run_id = RunId::generate();
        let started = Instant::now();
        info!(
            event_name = "orchestrator.round.dispatched",
            run_id = %run_id,
            module_id = %request.module_id,
            actor_id = %request.actor_id,
            providers = self.providers.len(),
            "dispatching plan round"
        );

        let results = match tokio::time::timeout(self.round_timeout, self.dispatch(&prompt)).await {
            Ok(results) => results,
            Err(_) => {
                warn!(
                    event_name = "orchestrator.round.deadline_exceeded",
                    run_id = %run_id,
                    module_id = %request.module_id,
                    timeout_secs = self.round_timeout.as_secs(),
                    "round deadline elapsed before all providers settled"
                );
                return Err(OrchestrationError::DeadlineExceeded {
                    timeout_secs: self.round_timeout.as_secs(),
                });
            }
        };

        for result in &results {
            info!(
                event_name = "orchestrator.provider.settled",
                run_id = %run_id,
                module_id = %request.module_id,
                provider = %result.provider(),
                ok = result.ok(),
                hash = result.hash().unwrap_or(""),
                error = result.error().unwrap_or(""),
                "provider settled"
            );
        }

        let decision = decide(&results, QUORUM_THRESHOLD);
        info!(
            event_name = "orchestrator.round.reduced",
            run_id = %run_id,
            module_id = %request.module_id,
            quorum_ok = decision.ok,
            winning_hash = decision.winning_hash().unwrap_or(""),
            ok_results = decision.all_hashes.len(),
            "quorum reduced"
        );

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = AuditRecord::from_round(
            run_id.clone(),
            request.module_id.clone(),
            request.actor_id.clone(),
            &request.intent,
            &results,
            &decision,
            latency_ms,
        );
        self.audit.insert(&record).await.map_err(|error| {
            OrchestrationError::Storage(format!(
                "audit write failed for {run_id}: {}",
                redact_pii(&error.to_string())
            ))
        })?;
        info!(
            event_name = "orchestrator.audit.written",
            run_id = %run_id,
            module_id = %request.module_id,
            quorum_ok = record.quorum_ok,
            latency_ms,
            "audit record written"
        );

        let Some(plan) = decision.winning_plan().cloned() else {
            return Err(OrchestrationError::QuorumFailed { run_id });
        };

        if let Err(violation) = self.validator.validate(&plan) {
            warn!(
                event_name = "orchestrator.constraint.rejected",
                run_id = %run_id,
                module_id = %request.module_id,
                budget = violation.budget.label(),
                actual = violation.actual,
                max = violation.max,
                "plan rejected by constraint gate"
            );
            return Err(OrchestrationError::Constraint { run_id, violation });
        }

        self.committer.commit(&request.module_id, &run_id, plan.clone(), expected_revision).await?;

        Ok(OrchestrationOutcome { run_id, module_id: request.module_id, plan })
    }

    /// Runs all three providers concurrently and waits for every one to settle.
    async fn dispatch(&self, prompt: &str) -> Vec<ProviderResult> {
        let [first, second, third] = &self.providers;
        let (first_out, second_out, third_out) =
            tokio::join!(first.complete(prompt), second.complete(prompt), third.complete(prompt));

        vec![
            ProviderResult::from_completion(first.kind(), first_out),
            ProviderResult::from_completion(second.kind(), second_out),
            ProviderResult::from_completion(third.kind(), third_out),
        ]
    }
}
