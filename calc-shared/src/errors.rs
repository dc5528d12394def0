//! Error taxonomy shared by the orchestrator and worker.

use thiserror::Error;
use tonic::Status;

/// Result alias used throughout the orchestrator core.
pub type CalcResult<T> = Result<T, CalcError>;

/// All error kinds the core raises.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("expression not found: {expression_id}")]
    ExpressionNotFound { expression_id: String },

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("no tasks available")]
    NoTasksAvailable,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CalcError {
    pub fn invalid_expression(reason: impl Into<String>) -> Self {
        Self::InvalidExpression(reason.into())
    }

    pub fn expression_not_found(expression_id: impl Into<String>) -> Self {
        Self::ExpressionNotFound {
            expression_id: expression_id.into(),
        }
    }

    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Whether a caller (typically the worker loop) should back off and retry
    /// rather than treat the error as terminal.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::NoTasksAvailable)
    }
}

/// Maps a [`CalcError`] to its gRPC status equivalent, per the documented
/// transport contract: `NoTasksAvailable` and not-found lookups are
/// distinguished from generic internal failures so the worker loop and
/// client callers can branch on them.
pub fn calc_error_to_status(error: &CalcError) -> Status {
    match error {
        CalcError::InvalidExpression(msg) => Status::invalid_argument(msg.clone()),
        CalcError::ExpressionNotFound { expression_id } => {
            Status::not_found(format!("expression not found: {expression_id}"))
        }
        CalcError::TaskNotFound { task_id } => {
            Status::not_found(format!("task not found: {task_id}"))
        }
        CalcError::NoTasksAvailable => Status::not_found("no tasks available"),
        CalcError::Store(_) | CalcError::Serialization(_) | CalcError::Internal(_) => {
            tracing::error!(error = %error, "internal error processing request");
            Status::internal("internal error")
        }
        CalcError::Config(msg) => {
            tracing::error!(error = %msg, "configuration error");
            Status::internal("internal error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_expression_constructor() {
        let err = CalcError::invalid_expression("unbalanced parentheses");
        match err {
            CalcError::InvalidExpression(msg) => assert_eq!(msg, "unbalanced parentheses"),
            _ => panic!("expected InvalidExpression variant"),
        }
    }

    #[test]
    fn expression_not_found_constructor() {
        let err = CalcError::expression_not_found("expr-1");
        match err {
            CalcError::ExpressionNotFound { expression_id } => {
                assert_eq!(expression_id, "expr-1")
            }
            _ => panic!("expected ExpressionNotFound variant"),
        }
    }

    #[test]
    fn no_tasks_available_is_recoverable() {
        assert!(CalcError::NoTasksAvailable.is_recoverable());
        assert!(!CalcError::internal("boom").is_recoverable());
    }

    #[test]
    fn status_mapping_distinguishes_no_tasks_from_not_found() {
        let no_tasks = calc_error_to_status(&CalcError::NoTasksAvailable);
        assert_eq!(no_tasks.code(), tonic::Code::NotFound);
        assert!(no_tasks.message().contains("no tasks"));

        let not_found = calc_error_to_status(&CalcError::task_not_found("t-1"));
        assert_eq!(not_found.code(), tonic::Code::NotFound);
        assert!(not_found.message().contains("t-1"));
    }

    #[test]
    fn status_mapping_invalid_expression_is_invalid_argument() {
        let status = calc_error_to_status(&CalcError::invalid_expression("bad"));
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn status_mapping_internal_hides_details() {
        let status = calc_error_to_status(&CalcError::internal("store corrupted"));
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("corrupted"));
    }
}
