use chrono::{DateTime, Utc};
use sqlx::Row;

use triad_core::audit::{AuditRecord, ProviderOutcome, RawProviderText, RunId};
use triad_core::domain::module::ModuleId;

use super::{AuditRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

fn row_to_audit(row: &sqlx::sqlite::SqliteRow) -> Result<AuditRecord, RepositoryError> {
    let run_id: String =
        row.try_get("run_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let module_id: String =
        row.try_get("module_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_id: String =
        row.try_get("actor_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let intent: String =
        row.try_get("intent").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let providers_json: String =
        row.try_get("providers_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quorum_ok: bool =
        row.try_get("quorum_ok").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let winning_hash: Option<String> =
        row.try_get("winning_hash").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let latency_ms: i64 =
        row.try_get("latency_ms").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let raw_json: String = row
        .try_get("raw_per_provider_json")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let latency_ms = u64::try_from(latency_ms)
        .map_err(|_| RepositoryError::Decode(format!("latency_ms is negative: {latency_ms}")))?;

    let providers: Vec<ProviderOutcome> = serde_json::from_str(&providers_json)
        .map_err(|e| RepositoryError::Decode(format!("providers_json: {e}")))?;
    let raw_per_provider: Vec<RawProviderText> = serde_json::from_str(&raw_json)
        .map_err(|e| RepositoryError::Decode(format!("raw_per_provider_json: {e}")))?;

    Ok(AuditRecord {
        run_id: RunId(run_id),
        module_id: ModuleId(module_id),
        actor_id,
        intent,
        providers,
        quorum_ok,
        winning_hash,
        latency_ms,
        raw_per_provider,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        let providers_json = serde_json::to_string(&record.providers)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let raw_json = serde_json::to_string(&record.raw_per_provider)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let latency_ms = i64::try_from(record.latency_ms).unwrap_or(i64::MAX);

        let result = sqlx::query(
            "INSERT INTO ai_audit (run_id, module_id, actor_id, intent, providers_json,
                                   quorum_ok, winning_hash, latency_ms,
                                   raw_per_provider_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.run_id.0)
        .bind(&record.module_id.0)
        .bind(&record.actor_id)
        .bind(&record.intent)
        .bind(&providers_json)
        .bind(record.quorum_ok)
        .bind(&record.winning_hash)
        .bind(latency_ms)
        .bind(&raw_json)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                Err(RepositoryError::DuplicateAudit(record.run_id.clone()))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn find_by_run_id(&self, run_id: &RunId) -> Result<Option<AuditRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT run_id, module_id, actor_id, intent, providers_json, quorum_ok,
                    winning_hash, latency_ms, raw_per_provider_json, created_at
             FROM ai_audit WHERE run_id = ?",
        )
        .bind(&run_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_audit(r)?)),
            None => Ok(None),
        }
    }
}
