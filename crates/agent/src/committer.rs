use std::sync::Arc;

use tracing::info;

use triad_core::audit::RunId;
use triad_core::domain::module::{ModuleId, ModuleRecord};
use triad_core::domain::plan::{Plan, PLAN_CONTRACT_VERSION};
use triad_core::errors::OrchestrationError;
use triad_db::{ModuleRepository, RepositoryError};

/// Sole writer of module records.
pub struct PlanCommitter {
    modules: Arc<dyn ModuleRepository>,
    plan_version: String,
}

impl PlanCommitter {
    pub fn new(modules: Arc<dyn ModuleRepository>) -> Self {
        Self { modules, plan_version: PLAN_CONTRACT_VERSION.to_string() }
    }

    pub fn with_plan_version(mut self, plan_version: impl Into<String>) -> Self {
        self.plan_version = plan_version.into();
        self
    }

    /// Revision a commit for `module_id` must match; 0 when the module is new.
    pub async fn current_revision(&self, module_id: &ModuleId) -> Result<u64, OrchestrationError> {
        let existing = self
            .modules
            .find_by_id(module_id)
            .await
            .map_err(|error| OrchestrationError::Storage(error.to_string()))?;
        Ok(existing.map(|module| module.revision).unwrap_or(0))
    }

    pub async fn commit(
        &self,
        module_id: &ModuleId,
        run_id: &RunId,
        plan: Plan,
        expected_revision: u64,
    ) -> Result<ModuleRecord, OrchestrationError> {
        let record = ModuleRecord::committed(
            module_id.clone(),
            run_id.clone(),
            plan,
            self.plan_version.clone(),
            expected_revision,
        );

        match self.modules.commit(&record, expected_revision).await {
            Ok(()) => {}
            Err(RepositoryError::RevisionConflict { .. }) => {
                return Err(OrchestrationError::CommitConflict {
                    run_id: run_id.clone(),
                    module_id: module_id.clone(),
                });
            }
            Err(error) => return Err(OrchestrationError::Storage(error.to_string())),
        }

        info!(
            event_name = "orchestrator.commit.applied",
            run_id = %run_id,
            module_id = %module_id,
            revision = record.revision,
            "module plan committed"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use triad_core::audit::RunId;
    use triad_core::domain::module::{ModuleId, ModuleStatus};
    use triad_core::domain::plan::Plan;
    use triad_core::errors::OrchestrationError;
    use triad_db::{InMemoryModuleRepository, ModuleRepository};

    use super::PlanCommitter;

    #[tokio::test]
    async fn commit_sets_ready_status_and_contract_version() {
        let modules = Arc::new(InMemoryModuleRepository::default());
        let committer = PlanCommitter::new(modules.clone());
        let module_id = ModuleId::default();

        assert_eq!(committer.current_revision(&module_id).await.expect("revision"), 0);
        let record = committer
            .commit(&module_id, &RunId("run-1".to_string()), Plan::default(), 0)
            .await
            .expect("commit");

        assert_eq!(record.status, ModuleStatus::Ready);
        assert_eq!(record.version, "1.5.0");
        assert_eq!(record.revision, 1);
        let stored = modules.find_by_id(&module_id).await.expect("find");
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn stale_revision_surfaces_commit_conflict() {
        let committer = PlanCommitter::new(Arc::new(InMemoryModuleRepository::default()));
        let module_id = ModuleId::default();
        committer
            .commit(&module_id, &RunId("run-1".to_string()), Plan::default(), 0)
            .await
            .expect("first commit");

        let error = committer
            .commit(&module_id, &RunId("run-2".to_string()), Plan::default(), 0)
            .await
            .expect_err("conflict");

        assert_eq!(
            error,
            OrchestrationError::CommitConflict {
                run_id: RunId("run-2".to_string()),
                module_id,
            }
        );
    }
}
