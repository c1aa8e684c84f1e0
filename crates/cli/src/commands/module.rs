use triad_core::domain::module::ModuleId;
use triad_db::{ModuleRepository, SqlModuleRepository};

use crate::commands::{
    build_runtime, load_config, open_database, to_data, CommandResult, EXIT_DATABASE, EXIT_OTHER,
};

pub fn run(module_id: Option<String>) -> CommandResult {
    let config = match load_config("module") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let runtime = match build_runtime("module") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let module_id =
        ModuleId(module_id.unwrap_or_else(|| config.orchestrator.default_module_id.clone()));
    let result = runtime.block_on(async {
        let pool = open_database("module", &config).await?;
        let found = SqlModuleRepository::new(pool.clone()).find_by_id(&module_id).await;
        pool.close().await;
        found.map_err(|error| {
            CommandResult::failure("module", "db_query", error.to_string(), EXIT_DATABASE)
        })
    });

    match result {
        Ok(Some(record)) => {
            let message = format!(
                "module `{module_id}` at revision {} (run {})",
                record.revision, record.last_run_id
            );
            match to_data("module", &record) {
                Ok(data) => CommandResult::success_with_data("module", message, Some(data)),
                Err(failure) => failure,
            }
        }
        Ok(None) => CommandResult::failure(
            "module",
            "not_found",
            format!("module `{module_id}` has no committed plan"),
            EXIT_OTHER,
        ),
        Err(failure) => failure,
    }
}
