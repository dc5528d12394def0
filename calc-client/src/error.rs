//! Client-side error types for talking to the calculator orchestrator.

use thiserror::Error;

/// Client operation result type.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors a caller of [`crate::GrpcClient`] may observe.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("request failed: {status}")]
    Request { status: tonic::Status },

    #[error("no tasks available")]
    NoTasksAvailable,

    #[error("invalid response: {field} - {reason}")]
    InvalidResponse { field: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        if status.code() == tonic::Code::NotFound && status.message().contains("no tasks") {
            ClientError::NoTasksAvailable
        } else {
            ClientError::Request { status }
        }
    }
}

impl ClientError {
    pub fn invalid_response(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Whether the worker loop should back off and retry rather than treat
    /// the error as a reason to abandon the task.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::NoTasksAvailable => true,
            ClientError::Request { status } => {
                matches!(
                    status.code(),
                    tonic::Code::Unavailable | tonic::Code::DeadlineExceeded | tonic::Code::Internal
                )
            }
            ClientError::InvalidResponse { .. } | ClientError::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_with_no_tasks_message_maps_to_dedicated_variant() {
        let status = tonic::Status::not_found("no tasks available");
        let err: ClientError = status.into();
        assert!(matches!(err, ClientError::NoTasksAvailable));
        assert!(err.is_recoverable());
    }

    #[test]
    fn other_not_found_maps_to_generic_request_error() {
        let status = tonic::Status::not_found("expression not found: e1");
        let err: ClientError = status.into();
        match err {
            ClientError::Request { status } => assert_eq!(status.code(), tonic::Code::NotFound),
            _ => panic!("expected Request variant"),
        }
    }

    #[test]
    fn invalid_response_is_not_recoverable() {
        let err = ClientError::invalid_response("task", "missing field");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn unavailable_status_is_recoverable() {
        let status = tonic::Status::unavailable("connection refused");
        let err: ClientError = status.into();
        assert!(err.is_recoverable());
    }
}
