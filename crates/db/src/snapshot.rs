use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use triad_core::errors::OrchestrationError;
use triad_core::schema::{CollectionSummary, SchemaSnapshot, SchemaSnapshotSource};

use crate::DbPool;

/// Reports the tables of a SQLite database as snapshot collections.
///
/// Internal tables (`sqlite_*`, `_sqlx_*`) are skipped. Field types are the
/// declared column affinities, lower-cased.
pub struct SqliteSchemaSnapshot {
    pool: DbPool,
    max_collections: usize,
}

impl SqliteSchemaSnapshot {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, max_collections: 50 }
    }

    pub fn with_max_collections(mut self, max_collections: usize) -> Self {
        self.max_collections = max_collections;
        self
    }

    async fn collect(&self) -> Result<Vec<CollectionSummary>, sqlx::Error> {
        let tables: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master
             WHERE type = 'table'
               AND name NOT LIKE 'sqlite_%'
               AND name NOT LIKE '_sqlx_%'
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<_, _>>()?;

        let mut collections = Vec::with_capacity(tables.len().min(self.max_collections));
        for table in tables.into_iter().take(self.max_collections) {
            let quoted = table.replace('"', "\"\"");

            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{quoted}\""))
                .fetch_one(&self.pool)
                .await?;

            let mut fields = BTreeMap::new();
            for column in sqlx::query(&format!("PRAGMA table_info(\"{quoted}\")"))
                .fetch_all(&self.pool)
                .await?
            {
                let name: String = column.try_get("name")?;
                let declared: String = column.try_get("type")?;
                let kind =
                    if declared.is_empty() { "any".to_string() } else { declared.to_lowercase() };
                fields.insert(name, kind);
            }

            collections.push(CollectionSummary {
                name: table,
                sample_doc_count: u64::try_from(count).unwrap_or_default(),
                fields,
            });
        }
        Ok(collections)
    }
}

#[async_trait]
impl SchemaSnapshotSource for SqliteSchemaSnapshot {
    async fn snapshot(&self) -> Result<SchemaSnapshot, OrchestrationError> {
        let collections = self
            .collect()
            .await
            .map_err(|error| OrchestrationError::Snapshot(error.to_string()))?;
        Ok(SchemaSnapshot { generated_at: Utc::now().to_rfc3339(), collections })
    }
}
