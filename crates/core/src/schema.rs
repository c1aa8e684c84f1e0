use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::OrchestrationError;

/// Read-only structural summary of the data store, serialized into the prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    pub generated_at: String,
    pub collections: Vec<CollectionSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub name: String,
    pub sample_doc_count: u64,
    /// Observed field name to inferred type name.
    pub fields: BTreeMap<String, String>,
}

/// Administrator-supplied schema hints, passed through to the prompt verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOverride {
    pub mandatory: Vec<String>,
    pub optional: Vec<String>,
    pub indexes: Vec<String>,
}

#[async_trait]
pub trait SchemaSnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<SchemaSnapshot, OrchestrationError>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticSchemaSnapshot {
    collections: Vec<CollectionSummary>,
}

impl StaticSchemaSnapshot {
    pub fn new(collections: Vec<CollectionSummary>) -> Self {
        Self { collections }
    }
}

#[async_trait]
impl SchemaSnapshotSource for StaticSchemaSnapshot {
    async fn snapshot(&self) -> Result<SchemaSnapshot, OrchestrationError> {
        Ok(SchemaSnapshot {
            generated_at: Utc::now().to_rfc3339(),
            collections: self.collections.clone(),
        })
    }
}
