use thiserror::Error;

use crate::{audit::RunId, constraints::ConstraintViolation, domain::module::ModuleId};

/// Failure of a single provider call. Never fatal to the round.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("authentication failure: {0}")]
    Auth(String),
}

/// Failure turning provider text into a `Plan`. Never fatal to the round.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid JSON: {0}")]
    Parse(String),
    #[error("plan schema mismatch: {0}")]
    Schema(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("invalid orchestration request: {0}")]
    InvalidRequest(String),
    #[error("schema snapshot unavailable: {0}")]
    Snapshot(String),
    #[error("round exceeded its {timeout_secs}s deadline before the audit write")]
    DeadlineExceeded { timeout_secs: u64 },
    #[error("quorum failed (see ai_audit/{run_id})")]
    QuorumFailed { run_id: RunId },
    #[error("{violation} (see ai_audit/{run_id})")]
    Constraint { run_id: RunId, violation: ConstraintViolation },
    #[error("module `{module_id}` was committed concurrently (see ai_audit/{run_id})")]
    CommitConflict { run_id: RunId, module_id: ModuleId },
    #[error("storage failure: {0}")]
    Storage(String),
}

impl OrchestrationError {
    /// Audit record id the caller can follow up on, when a round was recorded.
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            Self::QuorumFailed { run_id }
            | Self::Constraint { run_id, .. }
            | Self::CommitConflict { run_id, .. } => Some(run_id),
            Self::InvalidRequest(_)
            | Self::Snapshot(_)
            | Self::DeadlineExceeded { .. }
            | Self::Storage(_) => None,
        }
    }

    pub fn into_interface(self) -> InterfaceError {
        let correlation_id =
            self.run_id().map(|run_id| run_id.0.clone()).unwrap_or_else(|| "unassigned".to_owned());
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Rejected { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

/// Caller-facing error. Carries structured fields only, never provider text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("rejected: {message}")]
    Rejected { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Rejected { .. } => {
                "The proposed plan was not accepted. See the audit record for details."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Rejected { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<OrchestrationError> for InterfaceError {
    fn from(value: OrchestrationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            OrchestrationError::InvalidRequest(message) => {
                Self::BadRequest { message, correlation_id }
            }
            error @ (OrchestrationError::QuorumFailed { .. }
            | OrchestrationError::Constraint { .. }
            | OrchestrationError::CommitConflict { .. }) => {
                Self::Rejected { message: error.to_string(), correlation_id }
            }
            error @ (OrchestrationError::Snapshot(_)
            | OrchestrationError::DeadlineExceeded { .. }) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            OrchestrationError::Storage(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::RunId;
    use crate::constraints::{BudgetKind, ConstraintViolation};
    use crate::errors::{InterfaceError, OrchestrationError};

    #[test]
    fn quorum_failure_maps_to_rejected_with_run_id_correlation() {
        let interface =
            OrchestrationError::QuorumFailed { run_id: RunId("run-42".to_owned()) }.into_interface();

        assert!(matches!(
            interface,
            InterfaceError::Rejected { ref correlation_id, ref message }
                if correlation_id == "run-42" && message.contains("ai_audit/run-42")
        ));
        assert_eq!(
            interface.user_message(),
            "The proposed plan was not accepted. See the audit record for details."
        );
    }

    #[test]
    fn constraint_failure_message_reports_actual_and_max() {
        let error = OrchestrationError::Constraint {
            run_id: RunId("run-7".to_owned()),
            violation: ConstraintViolation {
                budget: BudgetKind::ReadsPerAction,
                actual: 3,
                max: 2,
            },
        };

        assert_eq!(error.to_string(), "plan violates reads/action max: 3 > 2 (see ai_audit/run-7)");
        assert_eq!(error.into_interface().correlation_id(), "run-7");
    }

    #[test]
    fn storage_failure_has_no_run_id_and_maps_to_internal() {
        let interface =
            OrchestrationError::Storage("database is locked".to_owned()).into_interface();

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.correlation_id(), "unassigned");
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn invalid_request_maps_to_bad_request() {
        let interface =
            OrchestrationError::InvalidRequest("intent must not be empty".to_owned())
                .into_interface();

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
    }
}
