use triad_core::audit::RunId;
use triad_db::{AuditRepository, SqlAuditRepository};

use crate::commands::{
    build_runtime, load_config, open_database, to_data, CommandResult, EXIT_DATABASE, EXIT_OTHER,
};

/// Prints the stored audit record for a round, including per-provider raw text.
pub fn run(run_id: String) -> CommandResult {
    let config = match load_config("audit") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("audit") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let run_id = RunId(run_id);
    let result = runtime.block_on(async {
        let pool = open_database("audit", &config).await?;
        let found = SqlAuditRepository::new(pool.clone()).find_by_run_id(&run_id).await;
        pool.close().await;
        found.map_err(|error| {
            CommandResult::failure("audit", "db_query", error.to_string(), EXIT_DATABASE)
        })
    });

    match result {
        Ok(Some(record)) => match to_data("audit", &record) {
            Ok(data) => CommandResult::success_with_data(
                "audit",
                format!("audit record `{run_id}`"),
                Some(data),
            ),
            Err(failure) => failure,
        },
        Ok(None) => CommandResult::failure(
            "audit",
            "not_found",
            format!("no audit record `{run_id}`"),
            EXIT_OTHER,
        ),
        Err(failure) => failure,
    }
}
