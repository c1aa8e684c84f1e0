use sqlx::Row;

use triad_core::audit::RunId;
use triad_core::domain::module::{ModuleId, ModuleRecord, ModuleStatus};
use triad_core::domain::plan::Plan;

use super::audit::parse_timestamp;
use super::{ModuleRepository, RepositoryError};
use crate::DbPool;

pub struct SqlModuleRepository {
    pool: DbPool,
}

impl SqlModuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_module(row: &sqlx::sqlite::SqliteRow) -> Result<ModuleRecord, RepositoryError> {
    let module_id: String =
        row.try_get("module_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let version: String =
        row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_run_id: String =
        row.try_get("last_run_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let plan_json: String =
        row.try_get("plan_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let revision: i64 =
        row.try_get("revision").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let status = ModuleStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown module status `{status_str}`")))?;
    let plan: Plan = serde_json::from_str(&plan_json)
        .map_err(|e| RepositoryError::Decode(format!("plan_json: {e}")))?;
    let revision = u64::try_from(revision)
        .map_err(|_| RepositoryError::Decode(format!("negative revision {revision}")))?;

    Ok(ModuleRecord {
        module_id: ModuleId(module_id),
        version,
        status,
        last_run_id: RunId(last_run_id),
        plan,
        updated_at: parse_timestamp(&updated_at_str)?,
        revision,
    })
}

fn to_sql_revision(revision: u64) -> Result<i64, RepositoryError> {
    i64::try_from(revision)
        .map_err(|_| RepositoryError::Decode(format!("revision {revision} out of range")))
}

#[async_trait::async_trait]
impl ModuleRepository for SqlModuleRepository {
    async fn find_by_id(&self, id: &ModuleId) -> Result<Option<ModuleRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT module_id, version, status, last_run_id, plan_json, updated_at, revision
             FROM modules WHERE module_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_module(r)?)),
            None => Ok(None),
        }
    }

    async fn commit(
        &self,
        record: &ModuleRecord,
        expected_revision: u64,
    ) -> Result<(), RepositoryError> {
        let plan_json =
            serde_json::to_string(&record.plan).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let revision = to_sql_revision(record.revision)?;

        let result = if expected_revision == 0 {
            sqlx::query(
                "INSERT INTO modules (module_id, version, status, last_run_id, plan_json,
                                      updated_at, revision)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(module_id) DO NOTHING",
            )
            .bind(&record.module_id.0)
            .bind(&record.version)
            .bind(record.status.as_str())
            .bind(&record.last_run_id.0)
            .bind(&plan_json)
            .bind(record.updated_at.to_rfc3339())
            .bind(revision)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE modules SET
                     version = ?,
                     status = ?,
                     last_run_id = ?,
                     plan_json = ?,
                     updated_at = ?,
                     revision = ?
                 WHERE module_id = ? AND revision = ?",
            )
            .bind(&record.version)
            .bind(record.status.as_str())
            .bind(&record.last_run_id.0)
            .bind(&plan_json)
            .bind(record.updated_at.to_rfc3339())
            .bind(revision)
            .bind(&record.module_id.0)
            .bind(to_sql_revision(expected_revision)?)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::RevisionConflict {
                module_id: record.module_id.clone(),
                expected: expected_revision,
            });
        }
        Ok(())
    }
}
