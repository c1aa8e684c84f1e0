use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::plan::Plan;

/// Estimated gzip ratio for added UI source, in tenths.
const GZIP_RATIO_TENTHS: u64 = 3;
/// Estimated main-thread cost per KiB of added gzip payload.
const TTI_MS_PER_KIB: u64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    ReadsPerAction,
    AddedGzipBytes,
    TtiImpactMs,
}

impl BudgetKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReadsPerAction => "reads/action",
            Self::AddedGzipBytes => "added gzip bytes",
            Self::TtiImpactMs => "TTI impact ms",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub budget: BudgetKind,
    pub actual: u64,
    pub max: u64,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan violates {} max: {} > {}", self.budget.label(), self.actual, self.max)
    }
}

pub trait ConstraintValidator: Send + Sync {
    fn validate(&self, plan: &Plan) -> Result<(), ConstraintViolation>;
}

/// Checks the plan against the budgets it declares, reads first.
#[derive(Clone, Copy, Debug, Default)]
pub struct BudgetConstraintValidator;

impl ConstraintValidator for BudgetConstraintValidator {
    fn validate(&self, plan: &Plan) -> Result<(), ConstraintViolation> {
        let perf = &plan.constraints.perf;

        check(BudgetKind::ReadsPerAction, plan.db.reads.len() as u64, perf.reads_per_action_max)?;
        check(
            BudgetKind::AddedGzipBytes,
            estimated_added_gzip_bytes(plan),
            perf.added_gzip_bytes_max,
        )?;
        check(BudgetKind::TtiImpactMs, estimated_tti_impact_ms(plan), perf.tti_impact_ms_max)?;
        Ok(())
    }
}

fn check(budget: BudgetKind, actual: u64, max: u64) -> Result<(), ConstraintViolation> {
    if actual > max {
        return Err(ConstraintViolation { budget, actual, max });
    }
    Ok(())
}

pub fn estimated_added_gzip_bytes(plan: &Plan) -> u64 {
    plan.total_patch_content_chars().saturating_mul(GZIP_RATIO_TENTHS).div_ceil(10)
}

pub fn estimated_tti_impact_ms(plan: &Plan) -> u64 {
    estimated_added_gzip_bytes(plan).saturating_mul(TTI_MS_PER_KIB).div_ceil(1024)
}
