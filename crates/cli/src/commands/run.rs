use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use triad_agent::{build_providers, OrchestrationRequest, PlanCommitter, QuorumOrchestrator};
use triad_core::domain::module::ModuleId;
use triad_core::errors::OrchestrationError;
use triad_core::schema::SchemaOverride;
use triad_db::{SqlAuditRepository, SqlModuleRepository, SqliteSchemaSnapshot};

use crate::commands::{
    build_runtime, load_config, open_database, to_data, CommandResult, EXIT_CONFIG,
    EXIT_CONSTRAINT, EXIT_OTHER, EXIT_QUORUM,
};
use crate::logging::init_logging;

#[derive(Clone, Debug, Default)]
pub struct RunArgs {
    pub intent: String,
    pub module_id: Option<String>,
    pub actor_id: String,
    /// JSON object with optional `mandatory`, `optional` and `indexes` lists.
    pub schema_override: Option<String>,
}

pub fn run(args: RunArgs) -> CommandResult {
    let config = match load_config("run") {
        Ok(config) => config,
        Err(result) => return result,
    };
    init_logging(&config);

    if let Err(error) = config.providers.require_credentials() {
        return CommandResult::failure(
            "run",
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        );
    }

    let schema_override = match parse_override(args.schema_override.as_deref()) {
        Ok(schema_override) => schema_override,
        Err(error) => return orchestration_failure(error),
    };

    let providers = match build_providers(&config.providers) {
        Ok(providers) => providers,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "provider_setup",
                format!("provider setup failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let runtime = match build_runtime("run") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let request = OrchestrationRequest {
        module_id: ModuleId(
            args.module_id.unwrap_or_else(|| config.orchestrator.default_module_id.clone()),
        ),
        intent: args.intent,
        schema_override,
        actor_id: args.actor_id,
    };

    let result = runtime.block_on(async {
        let pool = open_database("run", &config).await?;

        let orchestrator = QuorumOrchestrator::new(
            providers,
            Arc::new(SqliteSchemaSnapshot::new(pool.clone())),
            Arc::new(SqlAuditRepository::new(pool.clone())),
            PlanCommitter::new(Arc::new(SqlModuleRepository::new(pool.clone())))
                .with_plan_version(config.orchestrator.plan_version.clone()),
        )
        .with_round_timeout(Duration::from_secs(config.orchestrator.round_timeout_secs));

        let outcome = orchestrator.orchestrate(request).await;
        pool.close().await;
        outcome.map_err(orchestration_failure)
    });

    match result {
        Ok(outcome) => {
            let message = format!("plan committed to `{}` (run {})", outcome.module_id, outcome.run_id);
            match to_data("run", &outcome) {
                Ok(data) => CommandResult::success_with_data("run", message, Some(data)),
                Err(failure) => failure,
            }
        }
        Err(failure) => failure,
    }
}

fn parse_override(raw: Option<&str>) -> Result<Option<SchemaOverride>, OrchestrationError> {
    raw.map(|raw| {
        serde_json::from_str::<SchemaOverride>(raw).map_err(|error| {
            OrchestrationError::InvalidRequest(format!("--override is not a valid schema override: {error}"))
        })
    })
    .transpose()
}

pub(crate) fn classify(error: &OrchestrationError) -> (&'static str, u8) {
    match error {
        OrchestrationError::QuorumFailed { .. } => ("quorum_failed", EXIT_QUORUM),
        OrchestrationError::Constraint { .. } => ("constraint_violation", EXIT_CONSTRAINT),
        OrchestrationError::CommitConflict { .. } => ("commit_conflict", EXIT_OTHER),
        OrchestrationError::DeadlineExceeded { .. } => ("deadline_exceeded", EXIT_OTHER),
        OrchestrationError::InvalidRequest(_) => ("invalid_request", EXIT_OTHER),
        OrchestrationError::Snapshot(_) => ("schema_snapshot", EXIT_OTHER),
        OrchestrationError::Storage(_) => ("storage", EXIT_OTHER),
    }
}

fn orchestration_failure(error: OrchestrationError) -> CommandResult {
    let (error_class, exit_code) = classify(&error);
    let message = error.to_string();
    let run_id = error.run_id().map(|run_id| run_id.0.clone());
    let interface = error.into_interface();

    CommandResult::failure_with_data(
        "run",
        error_class,
        message,
        exit_code,
        Some(json!({
            "runId": run_id,
            "correlationId": interface.correlation_id(),
            "userMessage": interface.user_message(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use triad_core::audit::RunId;
    use triad_core::constraints::{BudgetKind, ConstraintViolation};
    use triad_core::errors::OrchestrationError;

    use super::{classify, parse_override};

    #[test]
    fn round_failures_have_distinct_exit_codes() {
        let run_id = RunId("run-1".to_string());
        let quorum = OrchestrationError::QuorumFailed { run_id: run_id.clone() };
        let constraint = OrchestrationError::Constraint {
            run_id,
            violation: ConstraintViolation { budget: BudgetKind::ReadsPerAction, actual: 3, max: 2 },
        };

        assert_eq!(classify(&quorum), ("quorum_failed", 6));
        assert_eq!(classify(&constraint), ("constraint_violation", 7));
        assert_eq!(classify(&OrchestrationError::Storage("x".into())).1, 8);
    }

    #[test]
    fn override_json_is_parsed_with_defaults() {
        let parsed = parse_override(Some(r#"{"indexes":["sku"]}"#)).expect("override");
        assert_eq!(parsed.map(|o| o.indexes), Some(vec!["sku".to_string()]));
        assert!(parse_override(None).expect("none").is_none());
        assert!(matches!(
            parse_override(Some("[1,2]")),
            Err(OrchestrationError::InvalidRequest(_))
        ));
    }
}
