pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod snapshot;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use repositories::{
    AuditRepository, InMemoryAuditRepository, InMemoryModuleRepository, ModuleRepository,
    RepositoryError, SqlAuditRepository, SqlModuleRepository,
};
pub use snapshot::SqliteSchemaSnapshot;
