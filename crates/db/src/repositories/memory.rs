use std::collections::HashMap;

use tokio::sync::RwLock;

use triad_core::audit::{AuditRecord, RunId};
use triad_core::domain::module::{ModuleId, ModuleRecord};

use super::{AuditRepository, ModuleRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryAuditRepository {
    records: RwLock<HashMap<String, AuditRecord>>,
}

impl InMemoryAuditRepository {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.run_id.0) {
            return Err(RepositoryError::DuplicateAudit(record.run_id.clone()));
        }
        records.insert(record.run_id.0.clone(), record.clone());
        Ok(())
    }

    async fn find_by_run_id(&self, run_id: &RunId) -> Result<Option<AuditRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&run_id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryModuleRepository {
    modules: RwLock<HashMap<String, ModuleRecord>>,
}

#[async_trait::async_trait]
impl ModuleRepository for InMemoryModuleRepository {
    async fn find_by_id(&self, id: &ModuleId) -> Result<Option<ModuleRecord>, RepositoryError> {
        let modules = self.modules.read().await;
        Ok(modules.get(&id.0).cloned())
    }

    async fn commit(
        &self,
        record: &ModuleRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        let mut modules = self.modules.write().await;
        let current = modules.get(&record.module_id.0).map(|m| m.revision).unwrap_or(0);
        if current != expected_revision {
            return Err(RepositoryError::RevisionConflict {
                module_id: record.module_id.clone(),
                expected: expected_revision,
            });
        }
        modules.insert(record.module_id.0.clone(), record.clone());
        Ok(())
    }
}
