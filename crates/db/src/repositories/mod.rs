use async_trait::async_trait;
use thiserror::Error;

use triad_core::audit::{AuditRecord, RunId};
use triad_core::domain::module::{ModuleId, ModuleRecord};

pub mod audit;
pub mod memory;
pub mod module;

pub use audit::SqlAuditRepository;
pub use memory::{InMemoryAuditRepository, InMemoryModuleRepository};
pub use module::SqlModuleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("audit record `{0}` already exists")]
    DuplicateAudit(RunId),
    #[error("module `{module_id}` changed concurrently (expected revision {expected})")]
    RevisionConflict { module_id: ModuleId, expected: u64 },
}

/// Append-only store for round audit records.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Inserts a new record. Fails with `DuplicateAudit` if the run id exists.
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError>;
    async fn find_by_run_id(&self, run_id: &RunId) -> Result<Option<AuditRecord>, RepositoryError>;
}

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    async fn find_by_id(&self, id: &ModuleId) -> Result<Option<ModuleRecord>, RepositoryError>;

    /// Writes `record` only if the stored revision still equals
    /// `expected_revision`. A module that does not exist yet has revision 0.
    async fn commit(
        &self,
        record: &ModuleRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError>;
}
